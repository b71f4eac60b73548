//! Plan requests: the ephemeral form input a plan is generated from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The form variant a request was collected from. Each kind has its own
/// form fields, output schema, and backend save endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// New business plan for a venture that does not exist yet.
    Venture,
    /// Consultation for a problem an existing business is facing.
    Consultation,
    /// Profit/loss check from reported sales and expenditure.
    Tracker,
}

/// A user-facing form field.
#[derive(Debug, Clone, Copy)]
pub struct FormField {
    pub name: &'static str,
    /// Optional fields left blank are interpolated as "Not specified".
    pub optional: bool,
}

const VENTURE_FIELDS: &[FormField] = &[
    FormField { name: "businesstype", optional: false },
    FormField { name: "location", optional: false },
    FormField { name: "Target_audience", optional: false },
    FormField { name: "capital", optional: false },
    FormField { name: "businessGoals", optional: false },
    FormField { name: "preferred_timeline", optional: true },
];

const CONSULTATION_FIELDS: &[FormField] = &[
    FormField { name: "businesssproblem", optional: false },
    FormField { name: "Businessactivities", optional: false },
    FormField { name: "Target_audience", optional: false },
    FormField { name: "Testedsolutions", optional: false },
    FormField { name: "businessGoals", optional: false },
    FormField { name: "propertiesofbusiness", optional: true },
];

const TRACKER_FIELDS: &[FormField] = &[
    FormField { name: "Businessactivities", optional: false },
    FormField { name: "Expenditure", optional: false },
    FormField { name: "Sales", optional: false },
    FormField { name: "Timeline", optional: true },
];

const VENTURE_SECTIONS: &[&str] = &[
    "executive_summary",
    "things_needed_to_start",
    "setup_checklist",
    "market_analysis",
    "marketing_strategy",
    "pricing_strategy",
    "financial_plan",
    "operations_plan",
    "growth_ideas",
];

const CONSULTATION_SECTIONS: &[&str] = &[
    "Address_the_suitation",
    "Suggest_a_bunch_of_solutions",
    "Review_best_option_to_solve_issue_and_why",
    "Give_a_step_by_step_guide_to_carry_out_the_solution",
    "Best_way_to_improve_business_with_business_properties",
];

const TRACKER_SECTIONS: &[&str] = &[
    "Businessactivities",
    "Expenditure",
    "Sales",
    "Timeline",
    "FinancialSummary",
];

impl PlanKind {
    pub fn form_fields(self) -> &'static [FormField] {
        match self {
            PlanKind::Venture => VENTURE_FIELDS,
            PlanKind::Consultation => CONSULTATION_FIELDS,
            PlanKind::Tracker => TRACKER_FIELDS,
        }
    }

    /// Section keys the prompt asks for, in display order. `title` is implied.
    pub fn section_keys(self) -> &'static [&'static str] {
        match self {
            PlanKind::Venture => VENTURE_SECTIONS,
            PlanKind::Consultation => CONSULTATION_SECTIONS,
            PlanKind::Tracker => TRACKER_SECTIONS,
        }
    }

    /// The field that names the business; required and used for fallback titles.
    pub fn subject_field(self) -> &'static str {
        match self {
            PlanKind::Venture => "businesstype",
            PlanKind::Consultation => "businesssproblem",
            PlanKind::Tracker => "Businessactivities",
        }
    }

    /// The narrative section that receives raw model text in a degraded plan.
    pub fn primary_narrative(self) -> &'static str {
        match self {
            PlanKind::Venture => "executive_summary",
            PlanKind::Consultation => "Address_the_suitation",
            PlanKind::Tracker => "Businessactivities",
        }
    }

    /// Backend path segment under `/api/` that stores plans of this kind.
    pub fn save_endpoint(self) -> &'static str {
        match self {
            PlanKind::Venture => "save-plan",
            PlanKind::Consultation => "save-con",
            PlanKind::Tracker => "save-tracker",
        }
    }
}

/// Free-text form input for one submission. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub kind: PlanKind,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl PlanRequest {
    pub fn new(kind: PlanKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    /// Raw field value, or "" when the user did not send it.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// What the business is, e.g. "Bakery".
    pub fn subject(&self) -> &str {
        self.field(self.kind.subject_field()).trim()
    }

    /// Title used when the model did not supply one.
    pub fn fallback_title(&self) -> String {
        let subject = self.subject();
        if subject.is_empty() {
            "Business Plan".to_string()
        } else {
            format!("{subject} Business Plan")
        }
    }

    /// Rejects requests whose subject field is blank. The prompt builder itself
    /// never validates; this runs at the HTTP edge.
    pub fn validate(&self) -> Result<(), String> {
        if self.subject().is_empty() {
            return Err(format!("{} cannot be empty", self.kind.subject_field()));
        }
        Ok(())
    }
}
