// Prompt templates for every plan kind.
// Reuses cross-cutting fragments from llm_client::prompts.
//
// Placeholders are `{name}` where name is a form field, `persona`, or `json_only`.
// Filling is single-pass, so user text is never re-scanned for placeholders.

use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, NOT_SPECIFIED, PERSONA};
use crate::planning::request::{PlanKind, PlanRequest};

/// New business plan prompt.
pub const VENTURE_PROMPT_TEMPLATE: &str = r#"{persona}

Based on the user's business type, location, and funding, generate a complete professional business plan with this exact structure:

{
  "title": "Business name and type",
  "executive_summary": "Overview (around 1000 words)",
  "things_needed_to_start": "Itemized list with estimated prices based on the capital {capital} and local rates",
  "setup_checklist": "Chronological setup steps",
  "market_analysis": "Local demand and competition analysis",
  "marketing_strategy": "Tailored marketing ideas for this location",
  "pricing_strategy": "Local pricing tiers based on current trends",
  "financial_plan": "Revenue goals and expense breakdown",
  "operations_plan": "Daily operations and staffing",
  "growth_ideas": "Scalable strategies and expansion ideas"
}

User's business input:
- Type: {businesstype}
- Location: {location}
- Target Audience: {Target_audience}
- Capital: {capital}
- Goals: {businessGoals}
- Timeline: {preferred_timeline}

{json_only}"#;

/// Existing-business consultation prompt.
pub const CONSULTATION_PROMPT_TEMPLATE: &str = r#"{persona}

Check current trends and local market conditions. Determine the currency and current prices from where the business operates.

Generate a professional consultation in STRICT JSON FORMAT with the following EXACT structure:

{
  "title": "Short name for the business and its problem",
  "Address_the_suitation": "Compelling overview of the situation (around 1000 words)",
  "Suggest_a_bunch_of_solutions": "A detailed list of different solutions to the problem",
  "Review_best_option_to_solve_issue_and_why": "Pick the best solution and explain why",
  "Give_a_step_by_step_guide_to_carry_out_the_solution": "Chronological steps to get the best results",
  "Best_way_to_improve_business_with_business_properties": "Concrete marketing ideas tailored to the business"
}

Business Details:
- Problem: {businesssproblem}
- Business Activities: {Businessactivities}
- Target Audience: {Target_audience}
- Tested Solutions: {Testedsolutions}
- Goals: {businessGoals}
- Business Properties: {propertiesofbusiness}

Provide detailed, locally relevant information in a professional tone suitable for investors.
{json_only}"#;

/// Financial tracker prompt.
pub const TRACKER_PROMPT_TEMPLATE: &str = r#"{persona}

You specialize in financial analysis for small and growing businesses. Based on the data provided, determine whether the business is operating at a profit or a loss. Calculate the exact difference between Sales and Expenditure and include a brief analysis.

Respond in STRICT JSON format with the following exact structure:

{
  "title": "Business name and reporting period",
  "Businessactivities": "What the business does, restated in one paragraph",
  "Expenditure": "Total expenditure for the period",
  "Sales": "Total sales for the period",
  "Timeline": "Reporting period",
  "FinancialSummary": {
    "Status": "Profit or Loss",
    "Amount": "Numeric value of (Sales - Expenditure)",
    "Insight": "One or two lines summarizing the financial standing and what it means"
  }
}

Input:
- Business Activities: {Businessactivities}
- Expenditure: {Expenditure}
- Sales: {Sales}
- Timeline: {Timeline}

Be concise and professional.
{json_only}"#;

fn template_for(kind: PlanKind) -> &'static str {
    match kind {
        PlanKind::Venture => VENTURE_PROMPT_TEMPLATE,
        PlanKind::Consultation => CONSULTATION_PROMPT_TEMPLATE,
        PlanKind::Tracker => TRACKER_PROMPT_TEMPLATE,
    }
}

/// Builds the instruction string for a request. Always succeeds: user text is
/// interpolated verbatim, unvalidated and unescaped.
pub fn build_prompt(request: &PlanRequest) -> String {
    let fields = request.kind.form_fields();
    fill_template(template_for(request.kind), |name| match name {
        "persona" => Some(PERSONA.to_string()),
        "json_only" => Some(JSON_ONLY_INSTRUCTION.to_string()),
        _ => {
            let field = fields.iter().find(|f| f.name == name)?;
            let value = request.field(name);
            if field.optional && value.trim().is_empty() {
                Some(NOT_SPECIFIED.to_string())
            } else {
                Some(value.to_string())
            }
        }
    })
}

/// Replaces `{identifier}` tokens the resolver knows; everything else, including
/// the JSON braces of the schema block, is copied through.
fn fill_template<F>(template: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let replacement = (ident_len > 0 && after[ident_len..].starts_with('}'))
            .then(|| resolve(&after[..ident_len]))
            .flatten();

        match replacement {
            Some(value) => {
                out.push_str(&value);
                rest = &after[ident_len + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
