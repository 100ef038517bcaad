//! Opaque handles correlating built nodes with code generator callbacks.

use crate::MK_ID;

MK_ID!(ExpressionId, "%");
MK_ID!(IdentifierId, "@");
MK_ID!(ModuleId, "module");
MK_ID!(JumpPointId, "L");
