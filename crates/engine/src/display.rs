//! Display transform registry.
//!
//! Rules turn a raw stored value into friendlier text for presentation and
//! substring search. They never touch the stored value.
//!
//! Key invariants:
//! - `DisplayMode::Raw` returns the raw value for every column
//! - Sort and type contexts always see the raw value, in either mode
//! - A failing rule (error or panic) falls back to the raw value
//!
//! Rules are registered by column name on `DisplayRules`, then bound once to a
//! dataset header, producing a `DisplayRegistry` keyed by `ColumnId`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Process-wide rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Raw,
    #[default]
    Friendly,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Raw => DisplayMode::Friendly,
            DisplayMode::Friendly => DisplayMode::Raw,
        }
    }
}

impl std::str::FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(DisplayMode::Raw),
            "friendly" => Ok(DisplayMode::Friendly),
            other => Err(format!("unknown display mode '{}'", other)),
        }
    }
}

/// What a rendered value is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderContext {
    /// Cell text shown to the user
    Display,
    /// Text matched by free-text search
    Filter,
    /// Value compared when ordering rows
    Sort,
    /// Value used for type detection
    Type,
}

impl RenderContext {
    fn is_presentation(self) -> bool {
        matches!(self, RenderContext::Display | RenderContext::Filter)
    }
}

/// A display rule rejected its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformFailure(pub String);

impl std::fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "display rule failed: {}", self.0)
    }
}

impl std::error::Error for TransformFailure {}

/// Pure raw-to-display function.
pub type DisplayRule = Arc<dyn Fn(&str) -> Result<String, TransformFailure> + Send + Sync>;

/// Stable column identifier: index into the dataset header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub usize);

/// Rules registered by column name, not yet bound to a header.
#[derive(Clone, Default)]
pub struct DisplayRules {
    rules: HashMap<String, DisplayRule>,
}

impl DisplayRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the rule for a column name.
    pub fn register<F>(&mut self, column: impl Into<String>, rule: F)
    where
        F: Fn(&str) -> Result<String, TransformFailure> + Send + Sync + 'static,
    {
        self.rules.insert(column.into(), Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve rules against a dataset header, once.
    pub fn bind(&self, dataset_header: &[String]) -> DisplayRegistry {
        let mut names = HashMap::with_capacity(dataset_header.len());
        let columns = dataset_header
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let name = name.trim();
                names.entry(name.to_string()).or_insert(ColumnId(idx));
                self.rules.get(name).cloned()
            })
            .collect();
        DisplayRegistry { columns, names }
    }

    /// The friendly renderings shipped with the application.
    pub fn builtin() -> Self {
        let mut rules = Self::new();

        for (column, label) in [
            ("GENDER_Male", "Male"),
            ("GENDER_Unknown", "Unknown"),
            ("ALCOHOL_USED_Yes", "Yes"),
            ("ALCOHOL_USED_Unknown", "Unknown"),
            ("TIME_CLUSTER_Morning", "Morning"),
            ("TIME_CLUSTER_Midday", "Midday"),
            ("TIME_CLUSTER_Midnight", "Midnight"),
        ] {
            rules.register(column, move |v| Ok(one_hot(v, label)));
        }

        rules.register("HOUR_COMMITTED", |v| Ok(hour_label(v)));
        rules.register("ACCIDENT_HOTSPOT", |v| Ok(hotspot_label(v)));
        rules.register("OFFENSE", |v| Ok(offense_label(v)));
        rules
    }
}

/// Rules bound to a dataset header.
#[derive(Clone, Default)]
pub struct DisplayRegistry {
    columns: Vec<Option<DisplayRule>>,
    names: HashMap<String, ColumnId>,
}

impl DisplayRegistry {
    /// Look up a column identifier by header text.
    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.names.get(name.trim()).copied()
    }

    pub fn has_rule(&self, column: ColumnId) -> bool {
        matches!(self.columns.get(column.0), Some(Some(_)))
    }

    /// Render a raw value for display.
    pub fn render(&self, column: ColumnId, raw: &str, mode: DisplayMode) -> String {
        self.render_in(column, raw, mode, RenderContext::Display)
    }

    /// Render a raw value for a given context.
    pub fn render_in(
        &self,
        column: ColumnId,
        raw: &str,
        mode: DisplayMode,
        context: RenderContext,
    ) -> String {
        if mode == DisplayMode::Raw || !context.is_presentation() {
            return raw.to_string();
        }
        let Some(Some(rule)) = self.columns.get(column.0) else {
            return raw.to_string();
        };
        apply_fail_open(rule, raw)
    }

    /// Render by header text; unknown columns render raw.
    pub fn render_named(&self, column: &str, raw: &str, mode: DisplayMode) -> String {
        match self.column_id(column) {
            Some(id) => self.render(id, raw, mode),
            None => raw.to_string(),
        }
    }
}

fn apply_fail_open(rule: &DisplayRule, raw: &str) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| rule(raw))) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log::debug!("{}; showing raw value {:?}", e, raw);
            raw.to_string()
        }
        Err(_) => {
            log::warn!("display rule panicked on {:?}; showing raw value", raw);
            raw.to_string()
        }
    }
}

// ── Built-in rules ──────────────────────────────────────────────────

fn one_hot(v: &str, label: &str) -> String {
    if v.trim() == "1" {
        label.to_string()
    } else {
        String::new()
    }
}

fn hour_label(v: &str) -> String {
    match v.trim().parse::<f64>() {
        Ok(n) if (0.0..=23.0).contains(&n) && n.fract() == 0.0 => format!("{:02}:00", n as u32),
        _ => v.to_string(),
    }
}

fn hotspot_label(v: &str) -> String {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n == -1.0 => "No cluster".to_string(),
        Ok(n) if n.fract() == 0.0 => format!("Hotspot #{}", n as i64),
        Ok(n) => format!("Hotspot #{}", n),
        Err(_) => v.to_string(),
    }
}

fn offense_label(v: &str) -> String {
    match v {
        "" => String::new(),
        "Property_and_Person" => "Property + Person".to_string(),
        "Person_Injury_Only" => "Person Injury Only".to_string(),
        "Property_Damage_Only" => "Property Damage Only".to_string(),
        other => other.to_string(),
    }
}
