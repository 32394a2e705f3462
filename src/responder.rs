//! Selector de respuestas del asistente por palabras clave.
//!
//! Flujo:
//!   1. Se pasa la consulta a minúsculas (plegado ASCII, sin normalización Unicode).
//!   2. Se recorre la tabla de temas en orden de declaración.
//!   3. Gana el primer tema con al menos una subcadena presente en la consulta.
//!   4. Si ninguno coincide, se devuelve el tema por defecto.
//!
//! Los cuerpos son HTML estático que el frontend inserta tal cual, así que
//! nunca se compone nada a partir del texto del usuario.

use serde::Serialize;

/// Identificador estable de cada tema de la tabla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicId {
    MainSections,
    SubstantialEquivalence,
    Rejection,
    Biocompatibility,
    PerformanceTesting,
    Timeline,
    Cost,
    Default,
}

impl TopicId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainSections => "main_sections",
            Self::SubstantialEquivalence => "substantial_equivalence",
            Self::Rejection => "rejection",
            Self::Biocompatibility => "biocompatibility",
            Self::PerformanceTesting => "performance_testing",
            Self::Timeline => "timeline",
            Self::Cost => "cost",
            Self::Default => "default",
        }
    }
}

/// Entrada de la tabla: disparadores en minúsculas y cuerpo HTML precompuesto.
#[derive(Debug)]
pub struct Topic {
    pub id: TopicId,
    pub matchers: &'static [&'static str],
    pub body: &'static str,
}

impl Topic {
    /// `lowered` debe venir ya en minúsculas.
    pub fn matches(&self, lowered: &str) -> bool {
        self.matchers.iter().any(|m| lowered.contains(m))
    }
}

const MAIN_SECTIONS_BODY: &str = "<strong>510(k) Main Sections:</strong><br><br>\
<strong>1. Device Description</strong> - Detailed specifications and design<br>\
<strong>2. Intended Use</strong> - Patient population and indications<br>\
<strong>3. Substantial Equivalence</strong> - Comparison to predicate device<br>\
<strong>4. Performance Testing</strong> - Bench testing and data<br>\
<strong>5. Labeling</strong> - Instructions for use and warnings<br>\
<strong>6. Biocompatibility</strong> - ISO 10993 testing results<br><br>\
Each section must meet specific FDA requirements per 21 CFR 807.87.";

const SUBSTANTIAL_EQUIVALENCE_BODY: &str = "<strong>Substantial Equivalence (SE)</strong> means your device has:<br><br>\
✅ The <strong>same intended use</strong> as a legally marketed predicate device<br>\
✅ <strong>Same technological characteristics</strong> OR different characteristics that don't raise safety/effectiveness concerns<br><br>\
<strong>What you need:</strong><br>\
• Identify a legally marketed predicate (with K-number)<br>\
• Create side-by-side comparison table<br>\
• Show performance data demonstrating equivalence<br>\
• Address any technological differences<br><br>\
<em>Tip: Use FDA's 510(k) database to find similar devices!</em>";

const REJECTION_BODY: &str = "<strong>Top reasons for 510(k) rejection:</strong><br><br>\
🚫 <strong>Missing critical sections</strong> (32% of cases)<br>\
• Incomplete substantial equivalence comparison<br>\
• Missing biocompatibility data<br>\
• Inadequate performance testing<br><br>\
🚫 <strong>Inadequate predicate comparison</strong><br>\
• Wrong or invalid predicate device<br>\
• Insufficient technological comparison<br><br>\
🚫 <strong>Regulatory non-compliance</strong><br>\
• Not following 21 CFR 807 requirements<br>\
• Missing references to applicable standards<br><br>\
<strong>Pro tip:</strong> Use our AI analyzer to catch these issues before submission!";

const BIOCOMPATIBILITY_BODY: &str = "<strong>Biocompatibility Testing (ISO 10993-1):</strong><br><br>\
<strong>Required for devices with patient contact:</strong><br>\
• Cytotoxicity (cell toxicity)<br>\
• Sensitization (allergic reactions)<br>\
• Irritation or intracutaneous reactivity<br><br>\
<strong>For prolonged contact (>24 hours), also add:</strong><br>\
• Systemic toxicity<br>\
• Genotoxicity<br>\
• Implantation testing<br><br>\
<strong>What to include in 510(k):</strong><br>\
✓ Biological risk assessment<br>\
✓ Material characterization<br>\
✓ Test reports from ISO 17025 accredited labs<br>\
✓ Justification for test selection";

const PERFORMANCE_TESTING_BODY: &str = "<strong>Performance Testing Requirements:</strong><br><br>\
<strong>Bench Testing:</strong><br>\
• Mechanical testing (durability, fatigue)<br>\
• Shelf life/stability testing<br>\
• Sterilization validation<br>\
• Software verification & validation<br><br>\
<strong>Standards to reference:</strong><br>\
• ASTM F1980 (accelerated aging)<br>\
• ISO 14971 (risk management)<br>\
• ISO 13485 (quality management)<br><br>\
<strong>Statistical requirements:</strong><br>\
• Sample sizes with rationale<br>\
• Mean, standard deviation, confidence intervals<br>\
• Pass/fail criteria";

const TIMELINE_BODY: &str = "<strong>510(k) Review Timeline:</strong><br><br>\
📅 <strong>FDA Target:</strong> 90 days for standard review<br>\
⏱️ <strong>Reality:</strong> 3-12 months average<br><br>\
<strong>Breakdown:</strong><br>\
• Administrative review: 15 days<br>\
• Substantive review: 60-90 days<br>\
• Additional info requests: +30-60 days each<br>\
• Final decision: 30 days after final submission";

const COST_BODY: &str = "<strong>510(k) Submission Costs:</strong><br><br>\
💰 <strong>FDA User Fees (2024):</strong><br>\
• Standard: $6,250 | Small business: $1,563<br><br>\
💰 <strong>Development & Testing:</strong><br>\
• Performance testing: $20K-$100K<br>\
• Biocompatibility: $15K-$50K<br>\
• Clinical studies: $100K-$1M+<br><br>\
💰 <strong>Regulatory Consultants:</strong><br>\
• Traditional: $15K-$25K per submission<br>\
• <strong>Our AI Tool: $499</strong> 🎉";

const DEFAULT_BODY: &str = "I can help you with:<br><br>\
• <strong>510(k) sections</strong> and requirements<br>\
• <strong>Substantial equivalence</strong> guidance<br>\
• <strong>Performance testing</strong> protocols<br>\
• <strong>Biocompatibility</strong> requirements<br>\
• <strong>Common rejection</strong> reasons<br>\
• <strong>Submission timeline</strong> and costs<br><br>\
Try asking about any of these topics, or ask a specific question about your submission!";

// El orden es parte del contrato: "testing cost" debe caer en rendimiento, no en costes.
static TOPICS: [Topic; 8] = [
    Topic {
        id: TopicId::MainSections,
        matchers: &["section", "what are", "main"],
        body: MAIN_SECTIONS_BODY,
    },
    Topic {
        id: TopicId::SubstantialEquivalence,
        matchers: &["substantial", "equivalence", "predicate"],
        body: SUBSTANTIAL_EQUIVALENCE_BODY,
    },
    Topic {
        id: TopicId::Rejection,
        matchers: &["reject", "refus", "fail"],
        body: REJECTION_BODY,
    },
    Topic {
        id: TopicId::Biocompatibility,
        matchers: &["biocompat", "iso 10993"],
        body: BIOCOMPATIBILITY_BODY,
    },
    Topic {
        id: TopicId::PerformanceTesting,
        matchers: &["perform", "test"],
        body: PERFORMANCE_TESTING_BODY,
    },
    Topic {
        id: TopicId::Timeline,
        matchers: &["time", "long", "timeline"],
        body: TIMELINE_BODY,
    },
    Topic {
        id: TopicId::Cost,
        matchers: &["cost", "price", "expensive"],
        body: COST_BODY,
    },
    // Siempre el último y sin disparadores.
    Topic {
        id: TopicId::Default,
        matchers: &[],
        body: DEFAULT_BODY,
    },
];

/// Tabla completa en orden de evaluación.
pub fn topics() -> &'static [Topic] {
    &TOPICS
}

/// Devuelve el tema que responde a `query`.
///
/// Nunca falla: una consulta vacía o sin coincidencias cae en el tema por defecto.
pub fn select_topic(query: &str) -> &'static Topic {
    let lowered = query.to_ascii_lowercase();
    let (candidates, default) = TOPICS.split_at(TOPICS.len() - 1);

    candidates
        .iter()
        .find(|topic| topic.matches(&lowered))
        .unwrap_or(&default[0])
}

/// Cuerpo HTML de la respuesta para `query`, devuelto literalmente.
pub fn select_response(query: &str) -> &'static str {
    select_topic(query).body
}
