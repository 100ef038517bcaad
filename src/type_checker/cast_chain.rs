//! Weighted cast chain resolution.
//!
//! Casts form a graph whose nodes are types and whose edges are
//! `CastDescriptor`s, either registered in the root scope or produced on
//! demand by matchers. Decay edges (dropping `REFERENCE`/`MUTABLE`) are
//! synthesised during the search. `find_cast_chain` runs a best-first
//! search ordered by `Weight`, carrying the value range along each path so
//! that range-dependent implicit casts can be checked, and flags a node as
//! ambiguous when two different predecessors reach it at the same minimal
//! weight.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    lookup_context::LookupContext,
    static_type::{StaticType, TypeFlags},
    value_range::ValueRange,
    weight::Weight,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastPolicy {
    Implicit,
    /// Implicit only when the source range fits the destination.
    ImplicitInRange,
    ExplicitOnly,
}

/// What the code generator has to do to perform one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastCodeGen {
    /// Load the value out of the referenced storage.
    Decay,
    ExpandSigned,
    ExpandUnsigned,
    Truncate,
    ChangeSign,
    PointerToBool,
    /// Same representation, nothing to emit.
    Reinterpret,
}

pub type CastVrp = fn(&Rc<ValueRange>, &StaticType) -> Rc<ValueRange>;

/// Produces an edge out of `source` for open-ended families of casts.
pub type CastMatcher = fn(&StaticType, &LookupContext) -> Option<CastDescriptor>;

#[derive(Debug)]
pub struct CastDescriptor {
    pub source: StaticType,
    pub destination: StaticType,
    pub weight: Weight,
    pub policy: CastPolicy,
    pub code_gen: CastCodeGen,
    pub vrp: CastVrp,
}

impl CastDescriptor {
    pub fn decay(source: &StaticType) -> CastDescriptor {
        CastDescriptor {
            source: source.clone(),
            destination: source.remove_flags(TypeFlags::REFERENCE | TypeFlags::MUTABLE),
            weight: Weight::step(1),
            policy: CastPolicy::Implicit,
            code_gen: CastCodeGen::Decay,
            vrp: preserve_range,
        }
    }

    /// Whether this edge may be taken for a value in `range`.
    pub fn usable(&self, range: &ValueRange, explicit: bool) -> bool {
        match self.policy {
            CastPolicy::Implicit => true,
            CastPolicy::ImplicitInRange => explicit || range.fits_in(&self.destination),
            CastPolicy::ExplicitOnly => explicit,
        }
    }
}

pub fn preserve_range(range: &Rc<ValueRange>, _destination: &StaticType) -> Rc<ValueRange> {
    Rc::clone(range)
}

#[derive(Debug, Clone)]
pub struct CastStep {
    pub descriptor: Rc<CastDescriptor>,
    /// Range of the value after this step.
    pub range: Rc<ValueRange>,
}

#[derive(Debug, Clone)]
pub struct CastChain {
    pub steps: Vec<CastStep>,
    pub weight: Weight,
}

impl CastChain {
    pub fn identity() -> Self {
        CastChain {
            steps: vec![],
            weight: Weight::ZERO,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn destination(&self) -> Option<&StaticType> {
        self.steps.last().map(|step| &step.descriptor.destination)
    }

    pub fn range(&self) -> Option<&Rc<ValueRange>> {
        self.steps.last().map(|step| &step.range)
    }
}

#[derive(Debug)]
pub enum CastSearch {
    Found { chain: CastChain, ambiguous: bool },
    Unreachable,
}

struct Node {
    type_: StaticType,
    weight: Weight,
    range: Rc<ValueRange>,
    predecessor: Option<(usize, Rc<CastDescriptor>)>,
    multiple_paths: bool,
    settled: bool,
}

fn outgoing(ctx: &LookupContext, type_: &StaticType) -> Vec<Rc<CastDescriptor>> {
    let mut edges = ctx.casts_from(type_);
    if type_
        .flags()
        .intersects(TypeFlags::REFERENCE | TypeFlags::MUTABLE)
    {
        edges.push(Rc::new(CastDescriptor::decay(type_)));
    }
    edges
}

/// Searches the cheapest chain of casts from `source` to `destination`.
///
/// Paths whose weight exceeds `limit` are never explored. The returned
/// chain's steps carry the range obtained by applying each step's VRP in
/// order, starting from `range`.
pub fn find_cast_chain(
    ctx: &LookupContext,
    source: &StaticType,
    range: &Rc<ValueRange>,
    destination: &StaticType,
    explicit: bool,
    limit: Weight,
) -> CastSearch {
    let mut nodes = vec![Node {
        type_: source.clone(),
        weight: Weight::ZERO,
        range: Rc::clone(range),
        predecessor: None,
        multiple_paths: false,
        settled: false,
    }];
    let mut index: HashMap<StaticType, usize> = HashMap::new();
    index.insert(source.clone(), 0);

    let mut frontier = BinaryHeap::new();
    frontier.push(Reverse((Weight::ZERO, 0usize)));

    while let Some(Reverse((weight, current))) = frontier.pop() {
        if nodes[current].settled || weight > nodes[current].weight {
            continue;
        }
        if weight > limit {
            break;
        }
        nodes[current].settled = true;

        if nodes[current].type_ == *destination {
            return CastSearch::Found {
                ambiguous: nodes[current].multiple_paths,
                chain: collect_chain(&nodes, current),
            };
        }

        let type_ = nodes[current].type_.clone();
        let current_range = Rc::clone(&nodes[current].range);
        let inherited = nodes[current].multiple_paths;

        for edge in outgoing(ctx, &type_) {
            if !edge.usable(&current_range, explicit) {
                continue;
            }

            let next_weight = weight + edge.weight;
            if next_weight > limit {
                continue;
            }
            let next_range = (edge.vrp)(&current_range, &edge.destination);

            match index.get(&edge.destination).copied() {
                None => {
                    trace!(from = %type_, to = %edge.destination, weight = %next_weight, "discovered");
                    index.insert(edge.destination.clone(), nodes.len());
                    frontier.push(Reverse((next_weight, nodes.len())));
                    nodes.push(Node {
                        type_: edge.destination.clone(),
                        weight: next_weight,
                        range: next_range,
                        predecessor: Some((current, Rc::clone(&edge))),
                        multiple_paths: inherited,
                        settled: false,
                    });
                }
                Some(next) => {
                    let node = &mut nodes[next];
                    if node.settled {
                        continue;
                    }

                    if next_weight < node.weight {
                        trace!(from = %type_, to = %edge.destination, weight = %next_weight, "relaxed");
                        node.weight = next_weight;
                        node.range = next_range;
                        node.predecessor = Some((current, Rc::clone(&edge)));
                        node.multiple_paths = inherited;
                        frontier.push(Reverse((next_weight, next)));
                    } else if next_weight == node.weight
                        && node.predecessor.as_ref().map(|(from, _)| *from) != Some(current)
                    {
                        trace!(from = %type_, to = %edge.destination, "second path of equal weight");
                        node.multiple_paths = true;
                    }
                }
            }
        }
    }

    CastSearch::Unreachable
}

fn collect_chain(nodes: &[Node], target: usize) -> CastChain {
    let mut steps = vec![];
    let mut current = target;

    while let Some((from, descriptor)) = &nodes[current].predecessor {
        steps.push(CastStep {
            descriptor: Rc::clone(descriptor),
            range: Rc::clone(&nodes[current].range),
        });
        current = *from;
    }
    steps.reverse();

    CastChain {
        steps,
        weight: nodes[target].weight,
    }
}

/// Resolves the cast of a `source` value in `range` to `destination`.
///
/// # Returns
///
/// * `Ok(Some(chain))` - the cheapest unambiguous chain (possibly identity)
/// * `Ok(None)` - no chain within budget and the destination is advisory
/// * `Err` - `AmbiguousCast`, or `CastNotAllowed` for a mandatory destination
pub fn resolve_cast(
    ctx: &LookupContext,
    source: &StaticType,
    range: &Rc<ValueRange>,
    destination: &StaticType,
    mandatory: bool,
    explicit: bool,
    position: &Position,
) -> Result<Option<CastChain>, Error> {
    if source == destination {
        return Ok(Some(CastChain::identity()));
    }

    match find_cast_chain(ctx, source, range, destination, explicit, ctx.cast_weight_limit()) {
        CastSearch::Found {
            ambiguous: true, ..
        } => Err(Error::new(
            ErrorImpl::AmbiguousCast {
                from: source.to_string(),
                to: destination.to_string(),
            },
            position.clone(),
        )),
        CastSearch::Found { chain, .. } => {
            debug!(from = %source, to = %destination, weight = %chain.weight, steps = chain.steps.len(), "resolved cast");
            Ok(Some(chain))
        }
        CastSearch::Unreachable if mandatory => Err(Error::new(
            ErrorImpl::CastNotAllowed {
                from: source.to_string(),
                to: destination.to_string(),
            },
            position.clone(),
        )),
        CastSearch::Unreachable => Ok(None),
    }
}
