use log::{debug, warn};

use crate::logic::metadata::{LabelPolicy, MetadataLookup};
use crate::model::{
    fits_tab_limit, humanize, schema_of, DisplayNames, RequiredState, Sheet, Tab, TemplateDocument, Workbook,
    DESCRIPTION_ROW, GUIDANCE_ROW, LABEL_ROW, PROPERTY_ROW, TAB_TITLE_LIMIT,
};

/// Mark the columns of an uploaded template on the composed tabs.
///
/// Known columns become `pre-selected` unless they are required already; columns
/// the schemas do not know are added as custom ones. Template tabs with no
/// composed counterpart are appended.
pub fn apply_template(tabs: &mut Vec<Tab>, template: &TemplateDocument) {
    for (name, template_tab) in template.iter() {
        let index = match tabs.iter().position(|tab| &tab.name == name) {
            Some(index) => index,
            None => {
                debug!("Template tab '{}' is not a composed tab, adding it", name);
                tabs.push(Tab::new(name.clone(), template_tab.display_name.clone()));
                tabs.len() - 1
            }
        };
        let tab = &mut tabs[index];

        for column in &template_tab.columns {
            let state = tab
                .properties
                .entry(column.clone())
                .or_insert(RequiredState::PreSelected);
            if !state.is_required() {
                *state = RequiredState::PreSelected;
            }
        }
        tab.select = true;
    }
}

/// Paths chosen on the tabs, the inverse of [`apply_template`]
pub fn preselected_paths(tabs: &[Tab]) -> Vec<&str> {
    tabs.iter()
        .flat_map(|tab| tab.properties.iter())
        .filter(|(_, state)| **state == RequiredState::PreSelected)
        .map(|(path, _)| path.as_str())
        .collect()
}

/// Lays a template out as a workbook, one sheet per template tab
pub struct WorkbookBuilder<'a> {
    metadata: MetadataLookup<'a>,
    labels: &'a dyn LabelPolicy,
    display_names: &'a DisplayNames,
}

impl<'a> WorkbookBuilder<'a> {
    pub fn new(metadata: MetadataLookup<'a>, labels: &'a dyn LabelPolicy, display_names: &'a DisplayNames) -> Self {
        Self {
            metadata,
            labels,
            display_names,
        }
    }

    pub fn from_template(&self, template: &TemplateDocument) -> Workbook {
        let mut workbook = Workbook::new();

        for (name, template_tab) in template.iter() {
            let title = sheet_title(&template_tab.display_name, name);
            if workbook.sheet(&title).is_some() {
                warn!("Template lists tab '{}' twice, keeping the first", title);
                continue;
            }

            let tab_schema = template_tab
                .columns
                .first()
                .map(|column| schema_of(column))
                .unwrap_or(name.as_str());

            let mut sheet = Sheet::new(title);
            for (column, path) in template_tab.columns.iter().enumerate() {
                self.write_column(&mut sheet, column, path, tab_schema);
            }
            workbook.add_sheet(sheet);
        }

        workbook
    }

    fn write_column(&self, sheet: &mut Sheet, column: usize, path: &str, tab_schema: &str) {
        match self.metadata.column(path) {
            Some(metadata) => {
                let header = self
                    .labels
                    .label(&metadata.header, path, tab_schema, self.display_names);
                sheet.set_cell(LABEL_ROW, column, header);
                sheet.set_cell(DESCRIPTION_ROW, column, metadata.description);
                sheet.set_cell(GUIDANCE_ROW, column, metadata.guidance);
            }
            None => {
                debug!("{} is a custom column", path);
                let name = path.rsplit('.').next().unwrap_or(path);
                sheet.set_cell(LABEL_ROW, column, humanize(name).to_uppercase());
            }
        }
        sheet.set_cell(PROPERTY_ROW, column, path);
    }
}

fn sheet_title(display_name: &str, name: &str) -> String {
    let title = if display_name.trim().is_empty() { name } else { display_name };
    if fits_tab_limit(title) {
        return title.to_string();
    }
    warn!("Tab title '{}' is too long for a sheet name, cutting it", title);
    title.chars().take(TAB_TITLE_LIMIT - 1).collect()
}
