//! Template Selector: scores the fixed set of twelve structural
//! templates against a request's contexts and the segment label
//! statistics, and picks the highest scorer.

use tone_core::request::{Context, Persona};
use tone_core::segment::LabelStats;
use tone_core::template::{EffectiveSection, SectionKey, SelectedTemplate, Template, TemplateId};

struct TemplateDefinition {
    id: TemplateId,
    primary_context: Context,
    secondary_contexts: &'static [Context],
    keywords: &'static [&'static str],
    excluded_personas: &'static [Persona],
    /// Only `T09_REJECTION`/`T12_WARNING_PREVENTION` carry this bonus
    /// (§4.10): `+2` when the segment labels show either aggression or
    /// negative feedback, so a calm message never outscores a plainer
    /// template just for matching one of these two contexts.
    has_aggression_bonus: bool,
    sections: &'static [SectionKey],
}

use SectionKey::*;

static DEFINITIONS: &[TemplateDefinition] = &[
    TemplateDefinition {
        id: TemplateId::T01General,
        primary_context: Context::Other,
        secondary_contexts: &[],
        keywords: &[],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S1Acknowledge, S3Facts, S5Request, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T02Request,
        primary_context: Context::Request,
        secondary_contexts: &[],
        keywords: &["부탁", "요청", "필요"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S1Acknowledge, S3Facts, S5Request, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T03Apology,
        primary_context: Context::Apology,
        secondary_contexts: &[],
        keywords: &["죄송", "사과", "불편"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S1Acknowledge, S2OurEffort, S4Responsibility, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T04RejectionSoft,
        primary_context: Context::Rejection,
        secondary_contexts: &[Context::Complaint],
        keywords: &["어렵", "곤란"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S1Acknowledge, S6Options, S7Policy, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T05FollowUp,
        primary_context: Context::FollowUp,
        secondary_contexts: &[],
        keywords: &["다시", "재차", "확인차"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S3Facts, S5Request, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T06Introduction,
        primary_context: Context::Introduction,
        secondary_contexts: &[],
        keywords: &["처음", "인사", "소개"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S1Acknowledge, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T07Notice,
        primary_context: Context::Notice,
        secondary_contexts: &[],
        keywords: &["안내", "공지", "알려"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S3Facts, S7Policy, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T08Gratitude,
        primary_context: Context::Gratitude,
        secondary_contexts: &[],
        keywords: &["감사", "고맙"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S1Acknowledge, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T09Rejection,
        primary_context: Context::Rejection,
        secondary_contexts: &[Context::WarningPrevention],
        keywords: &["불가", "안됩니다", "거절"],
        excluded_personas: &[],
        has_aggression_bonus: true,
        sections: &[S1Acknowledge, S4Responsibility, S6Options, S7Policy, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T10ComplaintResponse,
        primary_context: Context::Complaint,
        secondary_contexts: &[Context::Request],
        keywords: &["불만", "항의", "문제"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S1Acknowledge, S2OurEffort, S3Facts, S4Responsibility, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T11StatusUpdate,
        primary_context: Context::FollowUp,
        secondary_contexts: &[Context::Notice],
        keywords: &["진행", "현황", "상황"],
        excluded_personas: &[],
        has_aggression_bonus: false,
        sections: &[S0Greeting, S3Facts, S8Closing],
    },
    TemplateDefinition {
        id: TemplateId::T12WarningPrevention,
        primary_context: Context::WarningPrevention,
        secondary_contexts: &[Context::Notice],
        keywords: &["재발", "주의", "시정"],
        excluded_personas: &[Persona::Parent],
        has_aggression_bonus: true,
        sections: &[S1Acknowledge, S3Facts, S4Responsibility, S7Policy, S8Closing],
    },
];

fn score(def: &TemplateDefinition, contexts: &[Context], persona: Persona, text: &str, stats: &LabelStats) -> i32 {
    let mut score = if def.id == TemplateId::T01General { 1 } else { 0 };

    if contexts.contains(&def.primary_context) {
        score += 10;
    }
    for ctx in def.secondary_contexts {
        if contexts.contains(ctx) {
            score += 4;
        }
    }
    if def.keywords.iter().any(|kw| text.contains(kw)) {
        score += 3;
    }
    if def.has_aggression_bonus && (stats.has_aggression || stats.has_negative_feedback) {
        score += 2;
    }
    if def.excluded_personas.contains(&persona) {
        score -= 5;
    }

    score
}

/// Picks the template with the highest score, breaking ties on
/// ascending template id.
pub fn select(contexts: &[Context], persona: Persona, text: &str, stats: &LabelStats) -> SelectedTemplate {
    let mut best: Option<(&TemplateDefinition, i32)> = None;
    for def in DEFINITIONS {
        let s = score(def, contexts, persona, text, stats);
        let better = match best {
            None => true,
            Some((_, best_score)) => s > best_score,
        };
        if better {
            best = Some((def, s));
        }
    }

    let def = best.expect("DEFINITIONS is non-empty").0;
    let template = Template {
        id: def.id,
        sections: def.sections.to_vec(),
    };
    effective(template, persona)
}

/// Applies persona-specific skip rules: `Professor`/`Official` personas
/// get the optional-effort section expanded, `Other` gets it shortened.
fn effective(template: Template, persona: Persona) -> SelectedTemplate {
    let effective_sections = template
        .sections
        .iter()
        .map(|&key| EffectiveSection {
            key,
            expand: key == SectionKey::S2OurEffort && persona.is_high_formality(),
            shorten: key == SectionKey::S2OurEffort && persona == Persona::Other,
        })
        .collect();

    SelectedTemplate {
        id: template.id.id_str().to_string(),
        name: template.id.display_name().to_string(),
        effective_sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_context_dominates_plain_general() {
        let selected = select(&[Context::Apology], Persona::Client, "정말 죄송합니다", &LabelStats::default());
        assert_eq!(selected.id, "T03_APOLOGY");
    }

    #[test]
    fn excluded_persona_is_penalized() {
        // With no context match, T12 and T09 would tie on the +2 aggression
        // bonus alone (§4.10); the -5 persona exclusion pushes T12 below T09.
        let stats = LabelStats {
            has_aggression: true,
            ..Default::default()
        };
        let selected = select(&[], Persona::Parent, "", &stats);
        assert_eq!(selected.id, "T09_REJECTION");
        assert_ne!(selected.id, "T12_WARNING_PREVENTION");
    }

    #[test]
    fn aggression_bonus_applies_only_to_t09_and_t12() {
        let stats = LabelStats {
            has_aggression: true,
            ..Default::default()
        };
        // T04_REJECTION_SOFT shares T09's primary context but gets no bonus.
        let selected = select(&[Context::Rejection], Persona::Other, "", &stats);
        assert_eq!(selected.id, "T09_REJECTION");
    }

    #[test]
    fn ties_break_on_ascending_id() {
        let selected = select(&[], Persona::Other, "", &LabelStats::default());
        assert_eq!(selected.id, "T01_GENERAL");
    }
}
