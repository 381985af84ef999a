//! Flattening a graph to an [`EffectRecord`] and restoring it.
//!
//! Restoring re-instantiates every component by registry name and puts back
//! self-indices, numbers and slot bindings verbatim. Validation is not re-run:
//! a restored graph is trusted to match the registries it is loaded with.

use sigil_component::{Component, ComponentCategory, SlotBindings};
use sigil_config::{ComponentRecord, EffectRecord, SlotRecord};
use sigil_registry::TypeRegistry;
use tracing::{debug, info};

use crate::error::RecordError;
use crate::graph::{EffectParts, SingleEffect};

impl SingleEffect {
  /// Flatten the graph, components in index order.
  pub fn to_record(&self) -> EffectRecord {
    let components = self
      .components()
      .iter()
      .map(|component| ComponentRecord {
        category: component.category(),
        type_name: component.type_name().to_string(),
        self_index: component.self_index(),
        numbers: component.numbers(),
        slots: slot_record(component),
      })
      .collect();

    EffectRecord {
      effect_id: self.effect_id().to_string(),
      components,
      combiner: self.combiner_name().map(str::to_string),
    }
  }

  /// Rebuild a graph from a record.
  ///
  /// Names are looked up in `registry` first, then in each of `extra` in
  /// order.
  pub fn from_record(
    record: &EffectRecord,
    registry: &TypeRegistry,
    extra: &[&TypeRegistry],
  ) -> Result<SingleEffect, RecordError> {
    let registries: Vec<&TypeRegistry> = std::iter::once(registry)
      .chain(extra.iter().copied())
      .collect();
    let mut parts = EffectParts::new(record.effect_id.clone());

    for entry in &record.components {
      let component = registries
        .iter()
        .find_map(|registry| registry.instantiate(&entry.type_name))
        .ok_or_else(|| RecordError::UnknownComponentType {
          name: entry.type_name.clone(),
        })?;

      if component.category() != entry.category {
        return Err(RecordError::CategoryMismatch {
          name: entry.type_name.clone(),
          expected: entry.category,
          found: component.category(),
        });
      }

      component.set_self_index(entry.self_index);
      component.set_numbers(entry.numbers.clone());
      if entry.category.is_consumer() {
        component.set_bindings(bindings_from(&entry.slots));
      }

      if parts.insert(component).is_some() {
        return Err(RecordError::DuplicateSingleton {
          category: entry.category,
        });
      }
      debug!(
        component = %entry.type_name,
        self_index = entry.self_index,
        "component restored"
      );
    }

    if parts.trigger.is_none() {
      return Err(RecordError::Incomplete {
        category: ComponentCategory::Trigger,
      });
    }
    if parts.activity.is_none() {
      return Err(RecordError::Incomplete {
        category: ComponentCategory::Activity,
      });
    }

    if let Some(name) = &record.combiner {
      let combiner = registries
        .iter()
        .find_map(|registry| registry.combiner(name))
        .ok_or_else(|| RecordError::UnknownCombiner { name: name.clone() })?;
      parts.combiner = Some((name.clone(), combiner));
    }

    let graph = SingleEffect::assemble(parts, None);
    info!(
      effect_id = %graph.effect_id(),
      components = record.components.len(),
      "effect graph restored"
    );
    Ok(graph)
  }
}

fn slot_record(component: &Component) -> SlotRecord {
  if !component.category().is_consumer() {
    return SlotRecord::default();
  }
  let bindings = component.bindings();
  SlotRecord {
    source: bindings.source,
    params: bindings.params,
    targets: bindings.targets,
    affected: bindings.affected,
  }
}

fn bindings_from(slots: &SlotRecord) -> SlotBindings {
  SlotBindings {
    source: slots.source,
    params: slots.params.clone(),
    targets: slots.targets.clone(),
    affected: slots.affected,
  }
}
