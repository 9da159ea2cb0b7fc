//! Graphviz rendering of declared transitions.

use crate::core::StateValue;
use crate::error::FsmError;
use crate::field::{FieldBinding, Record};
use crate::model::Model;
use crate::transition::Source;
use std::collections::BTreeSet;
use std::fmt::Write;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    Labeled(String),
    Dotted,
}

/// Render every state field of `model` as a DOT digraph, one cluster per
/// field.
pub fn to_dot<T: Record>(model: &Model<T>) -> Result<String, FsmError> {
    let mut out = String::from("digraph {\n");
    for field in model.fields() {
        write_cluster(&mut out, model, &field)?;
    }
    out.push_str("}\n");
    Ok(out)
}

/// Render one state field of `model` as a DOT digraph.
pub fn field_to_dot<T: Record>(model: &Model<T>, field: &str) -> Result<String, FsmError> {
    let field = model.require_field(field)?;
    let mut out = String::from("digraph {\n");
    write_cluster(&mut out, model, &field)?;
    out.push_str("}\n");
    Ok(out)
}

fn write_cluster<T: Record>(
    out: &mut String,
    model: &Model<T>,
    field: &FieldBinding<T>,
) -> Result<(), FsmError> {
    let node = |state: &StateValue| {
        escape(&format!("{}.{}.{}", model.name(), field.name(), state))
    };
    let label = |state: &StateValue| escape(&field.label_for(state));

    let mut sources = BTreeSet::new();
    let mut targets = BTreeSet::new();
    let mut edges = BTreeSet::new();
    let mut any_targets = BTreeSet::new();
    let mut any_except_targets = BTreeSet::new();
    let mut wildcard_fallbacks = BTreeSet::new();

    for transition in model.all_transitions(field.name())? {
        let possible = transition.target().possible_states();
        match transition.source() {
            Source::Any => {
                any_targets
                    .extend(possible.into_iter().map(|t| (t, escape(transition.name()))));
            }
            Source::AnyExceptTarget => {
                any_except_targets
                    .extend(possible.into_iter().map(|t| (t, escape(transition.name()))));
            }
            Source::State(source) => {
                sources.insert((node(source), label(source)));
                for target in possible {
                    targets.insert((node(&target), label(&target)));
                    edges.insert((
                        node(source),
                        node(&target),
                        Edge::Labeled(escape(transition.name())),
                    ));
                }
            }
        }

        if let Some(fallback) = transition.on_error() {
            targets.insert((node(fallback), label(fallback)));
            match transition.source().state() {
                Some(source) => {
                    edges.insert((node(source), node(fallback), Edge::Dotted));
                }
                None => {
                    wildcard_fallbacks.insert(node(fallback));
                }
            }
        }
    }

    let source_names: Vec<String> = sources.iter().map(|(name, _)| name.clone()).collect();
    for (target, method) in any_targets {
        targets.insert((node(&target), label(&target)));
        for source in &source_names {
            edges.insert((source.clone(), node(&target), Edge::Labeled(method.clone())));
        }
    }
    for (target, method) in any_except_targets {
        let target_name = node(&target);
        targets.insert((target_name.clone(), label(&target)));
        for source in source_names.iter().filter(|source| **source != target_name) {
            edges.insert((source.clone(), target_name.clone(), Edge::Labeled(method.clone())));
        }
    }
    for fallback in wildcard_fallbacks {
        for source in &source_names {
            edges.insert((source.clone(), fallback.clone(), Edge::Dotted));
        }
    }

    let cluster = escape(&format!("{}.{}", model.name(), field.name()));
    let _ = writeln!(out, "  subgraph \"cluster_{cluster}\" {{");
    let _ = writeln!(out, "    label=\"{cluster}\"");

    let final_states: BTreeSet<_> = targets.difference(&sources).cloned().collect();
    for (name, label) in &final_states {
        let _ = writeln!(out, "    \"{name}\" [label=\"{label}\", shape=doublecircle]");
    }

    let default_name = node(field.default_state());
    for (name, label) in sources.union(&targets) {
        if final_states.contains(&(name.clone(), label.clone())) {
            continue;
        }
        let _ = writeln!(out, "    \"{name}\" [label=\"{label}\", shape=circle]");
        if *name == default_name {
            let initial = escape(&format!("{}.{}._initial", model.name(), field.name()));
            let _ = writeln!(out, "    \"{initial}\" [label=\"\", shape=point]");
            let _ = writeln!(out, "    \"{initial}\" -> \"{name}\"");
        }
    }

    for (from, to, edge) in edges {
        match edge {
            Edge::Labeled(label) => {
                let _ = writeln!(out, "    \"{from}\" -> \"{to}\" [label=\"{label}\"]");
            }
            Edge::Dotted => {
                let _ = writeln!(out, "    \"{from}\" -> \"{to}\" [style=dotted]");
            }
        }
    }
    out.push_str("  }\n");
    Ok(())
}

/// Escape text for a double-quoted DOT string.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
