use log::{debug, warn};

use super::{Engine, SequenceMerger};
use crate::concretizer::SequenceConcretizer;
use crate::context::Context;
use crate::error::Result;
use crate::iter::{CombinatorKind, LazyIterator, SingleValueIterator};
use crate::preparator::expand;
use crate::template::{flatten, Attr, Attrs, Call, Sequence};

/// Expands one symbolic sequence and returns the lazy stream of its
/// concrete versions.
pub fn process<'a>(ctx: &'a mut Context, attrs: &Attrs, calls: Vec<Call>) -> Result<SequenceConcretizer<'a>> {
    let mut calls = flatten(calls);
    ctx.ids.renumber(&mut calls);
    ctx.allocator.reset();
    let reserve = ctx.options.reserve_explicit;
    ctx.allocator.allocate(&mut calls, reserve, &mut ctx.rng)?;
    ctx.scopes.reset()?;
    let calls = expand(ctx, calls)?;

    let default = Sequence::new(calls);
    let source = solve(ctx, attrs, default)?;
    let presim = ctx.options.presimulation
        && attrs.get("presimulation").and_then(Attr::as_bool) != Some(false);
    Ok(SequenceConcretizer::new(ctx, source, presim))
}

fn solve(ctx: &mut Context, attrs: &Attrs, default: Sequence) -> Result<Box<dyn LazyIterator<Sequence>>> {
    let configs = match attrs.get("engines") {
        None => Attrs::new(),
        Some(Attr::Bool(false)) => {
            debug!("engines disabled");
            return Ok(Box::new(SingleValueIterator::new(default)));
        }
        Some(Attr::Map(map)) => map.clone(),
        Some(other) => {
            warn!("Ignoring malformed engines attribute: {other:?}");
            Attrs::new()
        }
    };

    let mut engines = std::mem::take(&mut ctx.registry.engines);
    let solved = solve_all(ctx, &mut engines, &configs, &default);
    ctx.registry.engines = engines;
    let solutions = solved?;

    if solutions.is_empty() {
        return Ok(Box::new(SingleValueIterator::new(default)));
    }
    let name = configs
        .get("combinator")
        .and_then(Attr::as_str)
        .unwrap_or("diagonal");
    let combinator = CombinatorKind::parse(name)?;
    Ok(Box::new(SequenceMerger::new(default, combinator.build(solutions))))
}

fn solve_all(
    ctx: &mut Context,
    engines: &mut [Box<dyn Engine>],
    configs: &Attrs,
    default: &Sequence,
) -> Result<Vec<Box<dyn LazyIterator<Sequence>>>> {
    let mut solutions = vec![];
    for engine in engines.iter_mut() {
        let id = engine.id().to_string();
        let attrs = match configs.get(&id) {
            None => Attrs::new(),
            Some(Attr::Bool(false)) => {
                debug!("engine {id} disabled");
                continue;
            }
            Some(Attr::Map(map)) => map.clone(),
            Some(other) => {
                warn!("Attributes of the '{id}' engine must be a map, got {other:?}");
                Attrs::new()
            }
        };
        let Some(selected) = engine.selector().select(default) else {
            continue;
        };
        if attrs.is_empty() {
            warn!("No attributes are provided for the '{id}' engine.");
        }
        engine.configure(&attrs)?;
        debug!("engine {id}: {} call(s) selected", selected.flags.iter().filter(|f| **f).count());
        solutions.push(engine.solve(ctx, selected)?);
    }
    Ok(solutions)
}
