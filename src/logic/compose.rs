use indexmap::IndexMap;
use log::{debug, warn};

use crate::model::{
    humanize, sub_tab_title, DisplayNames, OntologyRequiredPolicy, OrderingConfig, OrderingEntry, PropertyMap,
    RequiredState, SchemaProperties, Tab, PROCESS_SCHEMA, TAB_TITLE_LIMIT,
};

/// Ordered tabs plus the display names they were built with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub tabs: Vec<Tab>,
    pub display_names: DisplayNames,
    /// Promoted key to its own group title, without the parent prefix
    pub sub_titles: DisplayNames,
}

/// Turns flattened schemas into the ordered tabs users pick columns from
pub struct TabComposer<'a> {
    config: &'a OrderingConfig,
    policy: OntologyRequiredPolicy,
}

impl<'a> TabComposer<'a> {
    pub fn new(config: &'a OrderingConfig, policy: OntologyRequiredPolicy) -> Self {
        Self { config, policy }
    }

    pub fn compose(&self, schemas: &[SchemaProperties]) -> Composition {
        let by_name: IndexMap<&str, &SchemaProperties> =
            schemas.iter().map(|schema| (schema.name.as_str(), schema)).collect();

        let mut display_names = DisplayNames::new();
        let mut working: IndexMap<String, Tab> = IndexMap::new();
        for schema in schemas {
            display_names.insert(schema.name.clone(), schema.title.clone());
            working.insert(schema.name.clone(), self.schema_tab(schema));
        }

        self.link_biomaterials(&mut working);
        self.link_protocols(&mut working);

        let mut sub_titles = DisplayNames::new();
        let mut promoted = self.promote_sub_tabs(&mut working, &by_name, &mut sub_titles);
        for tab in promoted.values() {
            display_names.insert(tab.name.clone(), tab.title.clone());
        }

        let process_fields: PropertyMap = working
            .get(PROCESS_SCHEMA)
            .map(|tab| tab.properties.clone())
            .unwrap_or_default();

        let mut tabs = Vec::new();
        for (key, entry) in self.config.entries() {
            if let Some(mut tab) = working.shift_remove(key) {
                if entry == OrderingEntry::ProcessSchema {
                    for (path, state) in &process_fields {
                        tab.properties.entry(path.clone()).or_insert(*state);
                    }
                }
                tabs.push(tab);
            } else if let Some(tab) = promoted.shift_remove(key) {
                tabs.push(tab);
            } else {
                warn!("Ordering entry '{}' does not name a known schema or property group, skipping", key);
            }
        }

        Composition {
            tabs,
            display_names,
            sub_titles,
        }
    }

    /// A schema's tab with effective requiredness
    fn schema_tab(&self, schema: &SchemaProperties) -> Tab {
        let mut tab = Tab::new(schema.name.clone(), schema.title.clone());
        for (path, declared) in schema.all_properties() {
            let state = if schema.name == PROCESS_SCHEMA {
                RequiredState::NotRequired
            } else {
                self.effective_state(schema, path, *declared)
            };
            tab.properties.entry(path.clone()).or_insert(state);
        }
        tab.refresh_selection();
        tab
    }

    /// A nested flag only holds when the modules above the leaf are required too.
    ///
    /// Ontology units four levels down (`donor.timecourse.unit.text`) answer to the
    /// grandparent, not to the unit wrapper: under the `Wrapper` policy the
    /// grandparent's flag is also the starting value.
    fn effective_state(&self, schema: &SchemaProperties, path: &str, declared: RequiredState) -> RequiredState {
        let segments: Vec<&str> = path.split('.').collect();
        let is_text_leaf = segments.len() > 2 && segments.last() == Some(&"text");
        let is_unit_leaf = is_text_leaf && segments.len() == 4;

        let mut state = declared;
        if is_text_leaf && self.policy == OntologyRequiredPolicy::Wrapper {
            let decisive = if is_unit_leaf { 2 } else { segments.len() - 1 };
            if let Some(wrapper_state) = schema.module_state(&segments[..decisive].join(".")) {
                state = wrapper_state;
            }
        }
        if !state.is_required() {
            return state;
        }

        let ancestors: Vec<String> = if is_unit_leaf {
            vec![segments[..2].join(".")]
        } else {
            (2..segments.len()).map(|end| segments[..end].join(".")).collect()
        };
        let trusted = ancestors.iter().all(|ancestor| {
            schema
                .module_state(ancestor)
                .map_or(true, RequiredState::is_required)
        });

        RequiredState::from_required(trusted)
    }

    /// Children get an optional column referencing the biomaterial they derive from
    fn link_biomaterials(&self, working: &mut IndexMap<String, Tab>) {
        for (child, parent) in &self.config.biomaterial_linking {
            link_first_property(working, child, parent.trim());
        }
    }

    /// Biomaterials get an optional column per protocol applied to them
    fn link_protocols(&self, working: &mut IndexMap<String, Tab>) {
        for biomaterial in self.config.protocol_linking.keys() {
            for protocol in self.config.protocols_for(biomaterial) {
                link_first_property(working, biomaterial, protocol);
            }
        }
    }

    /// Move each configured property group out of its parent into a tab of its own
    fn promote_sub_tabs(
        &self,
        working: &mut IndexMap<String, Tab>,
        by_name: &IndexMap<&str, &SchemaProperties>,
        sub_titles: &mut DisplayNames,
    ) -> IndexMap<String, Tab> {
        let mut promoted = IndexMap::new();

        for (key, entry) in self.config.entries() {
            let OrderingEntry::SubTab { parent } = entry else {
                continue;
            };
            if working.contains_key(key) {
                continue;
            }
            let Some(parent_tab) = working.get_mut(parent) else {
                warn!("Sub-tab '{}' names unknown parent schema '{}', skipping", key, parent);
                continue;
            };

            let moved: PropertyMap = parent_tab
                .properties
                .iter()
                .filter(|(path, _)| path.split('.').skip(1).any(|segment| segment == key))
                .map(|(path, state)| (path.clone(), *state))
                .collect();
            if moved.is_empty() {
                warn!("Parent schema '{}' has no properties under '{}', skipping", parent, key);
                continue;
            }
            let remaining: PropertyMap = parent_tab
                .properties
                .iter()
                .filter(|(path, _)| !moved.contains_key(*path))
                .map(|(path, state)| (path.clone(), *state))
                .collect();
            parent_tab.properties = remaining;
            parent_tab.refresh_selection();

            let sub_title = by_name
                .get(parent)
                .and_then(|schema| schema.find_stand_alone(key))
                .map(|group| group.title.clone())
                .unwrap_or_else(|| humanize(key));
            let title = promoted_title(&parent_tab.title, &sub_title, key);
            sub_titles.insert(key, sub_title);

            debug!("Promoted {} properties of '{}' into '{}'", moved.len(), parent, title);
            let mut tab = Tab::new(key, title);
            tab.properties = moved;
            tab.refresh_selection();
            promoted.insert(key.to_string(), tab);
        }

        promoted
    }
}

fn link_first_property(working: &mut IndexMap<String, Tab>, target: &str, source: &str) {
    let Some(first) = working
        .get(source)
        .and_then(|tab| tab.first_property())
        .map(str::to_string)
    else {
        warn!("Linking source '{}' is not a known schema, skipping", source);
        return;
    };
    match working.get_mut(target) {
        Some(tab) => tab.add_optional(&first),
        None => warn!("Linking target '{}' is not a known schema, skipping", target),
    }
}

fn promoted_title(parent_title: &str, sub_title: &str, key: &str) -> String {
    if let Some(title) = sub_tab_title(parent_title, sub_title) {
        return title;
    }
    let humanized = humanize(key);
    if humanized.chars().count() < TAB_TITLE_LIMIT {
        return humanized;
    }
    warn!("No title for sub-tab '{}' fits {} characters, cutting '{}'", key, TAB_TITLE_LIMIT, sub_title);
    sub_title.chars().take(TAB_TITLE_LIMIT - 1).collect()
}
