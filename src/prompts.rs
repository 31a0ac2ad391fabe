//! Request builder: maps typed feature input to the shared persona instruction and a
//! per-feature task prompt. Everything here is pure.

use serde::Serialize;

use crate::error::{MunAssistantError, Result};
use crate::models::{FeatureId, PositionPaperRecord};

/// Persona shared by every feature.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an expert Model United Nations (MUN) advisor who coaches high-school and university delegates.
You know parliamentary procedure, the UN system, its agencies and treaties, and the foreign policy of every member state.
Always answer with a formal, diplomatic and respectful tone, as a senior diplomat would.
Be precise, practical and concise. Do not use markdown: no asterisks, no headings with hashes, no tables.
Answer in the same language the delegate uses in their request."#;

/// Speaking rate of 2.3 words per second, kept as a ratio so word targets stay exact.
pub const SPEAKING_RATE_WORDS_PER_TEN_SECONDS: u32 = 23;
/// Seconds reserved for the delegate to walk up and settle.
pub const SPEECH_TIME_MARGIN_SECONDS: u32 = 10;
pub const MIN_SPEECH_SECONDS: u32 = 30;

pub const POSITION_PAPER_MIN_WORDS: usize = 500;
pub const POSITION_PAPER_MAX_WORDS: usize = 800;

/// Fixed hostile delegation played by the model during interpellation.
pub const HOSTILE_DELEGATION: &str = "To' Revuelto";

/// Counts whitespace-separated words.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Advisory length indicator for position papers. Never blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WordCountStatus {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub within_bounds: bool,
}

impl WordCountStatus {
    pub fn of(content: &str) -> Self {
        let count = word_count(content);
        Self {
            count,
            min: POSITION_PAPER_MIN_WORDS,
            max: POSITION_PAPER_MAX_WORDS,
            within_bounds: (POSITION_PAPER_MIN_WORDS..=POSITION_PAPER_MAX_WORDS).contains(&count),
        }
    }
}

/// Reading time and length a generated speech should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeechTarget {
    pub requested_seconds: u32,
    pub target_seconds: u32,
    pub target_words: u32,
}

impl SpeechTarget {
    pub fn new(requested_seconds: u32) -> Self {
        let target_seconds = requested_seconds
            .saturating_sub(SPEECH_TIME_MARGIN_SECONDS)
            .max(MIN_SPEECH_SECONDS);
        let target_words = target_seconds * SPEAKING_RATE_WORDS_PER_TEN_SECONDS / 10;
        Self {
            requested_seconds,
            target_seconds,
            target_words,
        }
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MunAssistantError::validation(field, format!("{field} must not be empty")));
    }
    Ok(())
}

/// A form whose submission becomes one generation call.
///
/// Implementations carry the validation rule, the prompt template, the grounding flag and the
/// placeholder used when the model returns no text.
pub trait PromptForm: Send + Sync {
    fn feature(&self) -> FeatureId;

    /// Rejects input that must never reach the generation service.
    fn validate(&self) -> Result<()>;

    fn task_prompt(&self) -> String;

    fn use_web_grounding(&self) -> bool {
        false
    }

    /// Shown instead of an empty model answer.
    fn empty_placeholder(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
}

impl PromptForm for SearchRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::Search
    }

    fn validate(&self) -> Result<()> {
        require_text("query", &self.query)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"Act as a research assistant for a MUN delegate.
Find links and resources that answer the following question: "{query}".

STRICT FORMAT RULES (VERY IMPORTANT):
1. Asterisks (*), bullets and brackets ([]) are FORBIDDEN. Your answer must be clean plain text.
2. For each result, follow exactly this order:
   - Line 1: the exact URL of the resource.
   - Line 2: one short paragraph explaining why this link is related to the question.
3. Leave one blank line between resources.

CONTENT RULES:
1. Prefer .org sources first, then government (.gov) sources, then United Nations sources.
2. Order the information by date, newest first.
3. Do not give excessive information; get to the point."#,
            query = self.query
        )
    }

    fn use_web_grounding(&self) -> bool {
        true
    }

    fn empty_placeholder(&self) -> &'static str {
        "No results were found."
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub topic: String,
    pub country: String,
    pub requested_seconds: u32,
}

impl SpeechRequest {
    pub fn target(&self) -> SpeechTarget {
        SpeechTarget::new(self.requested_seconds)
    }
}

impl PromptForm for SpeechRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::SpeechGenerator
    }

    fn validate(&self) -> Result<()> {
        require_text("topic", &self.topic)?;
        require_text("country", &self.country)?;
        if self.requested_seconds <= SPEECH_TIME_MARGIN_SECONDS {
            return Err(MunAssistantError::validation(
                "seconds",
                format!(
                    "speaking time must be greater than {SPEECH_TIME_MARGIN_SECONDS} seconds, got {}",
                    self.requested_seconds
                ),
            ));
        }
        Ok(())
    }

    fn task_prompt(&self) -> String {
        let target = self.target();
        let country = &self.country;
        format!(
            r#"Write a MUN (Model United Nations) speech acting strictly as the delegation of {country}.

PARAMETERS:
- Topic: {topic}
- Country: {country}
- Target reading time: {seconds} seconds (about {words} words). STICK TO THIS LENGTH.

MANDATORY STRUCTURE (follow this order):

1. INTRODUCTION (Global context, without naming the topic explicitly):
   - Do NOT say "The topic is..." and do not mention the exact name of the topic at the start.
   - Address the problem globally, in an emotional and urgent way.
   - Use striking figures or international context.
   - The goal is to capture the room's attention immediately.

2. DEVELOPMENT (National context of {country}, cause and effect):
   - Explain WHICH specific measures (laws, programs, treaties) {country} has taken on this matter.
   - CRUCIAL: explain WHY those measures were taken. Which internal problem, crisis or need did they answer?
   - Logical structure: "Because of [problem X], the nation implemented [measure Y]".
   - Show how the real situation affects the country.

3. CONCLUSION (Global, innovative solutions and closing):
   - Propose one concrete solution (it may be an invented initiative with its own name) that helps ALL countries.
   - SOLUTION DETAILS: state WHAT it is, HOW it will be carried out and WITH WHICH FUNDS it will be financed.
   - CLOSING: end with a powerful sentence, a challenging rhetorical question or a quote that appeals to the conscience of the room.

TONE AND STYLE:
- ALWAYS speak in the THIRD PERSON ("The delegation of {country}", "This nation"). NEVER use "I".
- The speech must be moving (conveying strength, need, hope or indignation) while keeping diplomatic rigor.
- Take inspiration from the oratory of senior diplomats."#,
            topic = self.topic,
            seconds = target.target_seconds,
            words = target.target_words,
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The speech could not be generated."
    }
}

/// First interpellation stage: the hostile delegation's question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub speech: String,
}

impl PromptForm for ChallengeRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::Interpellation
    }

    fn validate(&self) -> Result<()> {
        require_text("speech", &self.speech)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"Act as the delegation of "{HOSTILE_DELEGATION}" in a Model United Nations.
Your goal is to make an INTERPELLATION (Point of Information / question) to the delegate who has just given the following speech.

RULES:
1. Identify yourself explicitly as: "The delegation of {HOSTILE_DELEGATION}...".
2. Do NOT analyse or correct the speech. You must ask ONE CHALLENGING QUESTION or direct objection.
3. Base it on what the delegate has just said. Look for contradictions, lack of realism, hypocrisy or missing funding.
4. Use strict parliamentary language (always in the third person).

Example of the expected tone:
"Honourable chair, the delegation of {HOSTILE_DELEGATION} has listened carefully, but is obliged to ask: how does the proposing delegation intend to finance such an initiative...?"

SPEECH TO INTERPELLATE:
"{speech}""#,
            speech = self.speech
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The interpellation could not be generated."
    }
}

/// Second interpellation stage: a suggested answer for the delegate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseRequest {
    pub speech: String,
    pub challenge: String,
}

impl PromptForm for DefenseRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::Interpellation
    }

    fn validate(&self) -> Result<()> {
        require_text("speech", &self.speech)?;
        require_text("challenge", &self.challenge)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"Act as a STRATEGIC DEBATE ADVISER for the delegate who gave the speech.

CONTEXT:
1. Original speech: "{speech}"
2. Hostile question received (interpellation): "{challenge}"

TASK:
Write a DIPLOMATIC AND FORCEFUL ANSWER for the delegate to read.

REQUIREMENTS:
1. It must answer the question directly, using logical data or smart rhetoric.
2. It must use formal parliamentary language in the third person ("This delegation...", "We thank the delegation for its question...").
3. It must be brief (one paragraph at most).
4. The goal is to dismantle the argument of "{HOSTILE_DELEGATION}" and leave the delegate standing on solid knowledge."#,
            speech = self.speech,
            challenge = self.challenge
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "A defense suggestion could not be generated."
    }
}

/// Last interpellation stage: the chair's verdict on the delegate's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictRequest {
    pub speech: String,
    pub challenge: String,
    pub reply: String,
}

impl PromptForm for VerdictRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::Interpellation
    }

    fn validate(&self) -> Result<()> {
        require_text("speech", &self.speech)?;
        require_text("challenge", &self.challenge)?;
        require_text("reply", &self.reply)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"Act as the CHAIR (dais) of a Model United Nations.

CONTEXT:
1. A delegate gave this speech: "{speech}"
2. The delegation of {HOSTILE_DELEGATION} asked them (interpellation): "{challenge}"
3. The delegate replied: "{reply}"

TASK:
Evaluate the delegate's reply.
- Did they answer the question directly or evade it?
- Did they keep diplomatic language and composure?
- Was their defense logical?

Give a brief verdict and one tip to improve. Speak as the chair ("The chair considers that...")."#,
            speech = self.speech,
            challenge = self.challenge,
            reply = self.reply
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The reply could not be evaluated."
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    pub speech: String,
}

impl PromptForm for CorrectionRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::SpeechCorrection
    }

    fn validate(&self) -> Result<()> {
        require_text("speech", &self.speech)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"Correct and analyse the following MUN speech strictly against this structure:

1. Introduction (global level): global context, international data (UN, WHO, etc.).
2. Development (national level): focus on the represented country, state measures, internal policies.
3. Conclusion (international level / proposals): realistic, cooperative solutions.

Assess whether each section is fulfilled and suggest improvements in diplomatic wording.

SPEECH:
"{speech}""#,
            speech = self.speech
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The correction could not be generated."
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownRequest {
    pub topic: String,
}

impl PromptForm for BreakdownRequest {
    fn feature(&self) -> FeatureId {
        FeatureId::TopicBreakdown
    }

    fn validate(&self) -> Result<()> {
        require_text("topic", &self.topic)
    }

    fn task_prompt(&self) -> String {
        format!(
            r#"The delegate needs to research the topic: "{topic}".
Provide a list of deep, strategic research questions (a research guide) so the delegate can write their position paper or speech.

The questions must cover:
- Historical background.
- Current international situation.
- Blocs and alliances.
- Past actions of the UN."#,
            topic = self.topic
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The topic could not be broken down."
    }
}

impl PromptForm for PositionPaperRecord {
    fn feature(&self) -> FeatureId {
        FeatureId::PositionPaper
    }

    // Word count is advisory only
    fn validate(&self) -> Result<()> {
        require_text("topic", &self.topic)?;
        require_text("content", &self.content)
    }

    fn task_prompt(&self) -> String {
        let count = word_count(&self.content);
        format!(
            r#"Review the following Position Paper.

DATA:
- Topic: {topic}
- Committee: {committee}
- Delegation: {delegation}
- Delegate: {delegate}
- Current word count: {count}

REVIEW RULES:
1. Check that the word count is between {min} and {max}. If it is not, report it as a serious error.
2. Check that it has the structure of a formal speech plus a Bibliography at the end.
3. The tone must be diplomatic.
4. Check the coherence between the foreign policy of the country ({delegation}) and the proposals.

CONTENT:
"{content}""#,
            topic = self.topic,
            committee = self.committee,
            delegation = self.delegation,
            delegate = self.delegate_name,
            min = POSITION_PAPER_MIN_WORDS,
            max = POSITION_PAPER_MAX_WORDS,
            content = self.content,
        )
    }

    fn empty_placeholder(&self) -> &'static str {
        "The document could not be reviewed."
    }
}

/// Any submission the assistant accepts, one variant per feature action.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRequest {
    Search(SearchRequest),
    Speech(SpeechRequest),
    Challenge(ChallengeRequest),
    Defense(DefenseRequest),
    Verdict(VerdictRequest),
    Correction(CorrectionRequest),
    Breakdown(BreakdownRequest),
    PositionPaper(PositionPaperRecord),
}

impl FeatureRequest {
    fn form(&self) -> &dyn PromptForm {
        match self {
            FeatureRequest::Search(r) => r,
            FeatureRequest::Speech(r) => r,
            FeatureRequest::Challenge(r) => r,
            FeatureRequest::Defense(r) => r,
            FeatureRequest::Verdict(r) => r,
            FeatureRequest::Correction(r) => r,
            FeatureRequest::Breakdown(r) => r,
            FeatureRequest::PositionPaper(r) => r,
        }
    }
}

impl PromptForm for FeatureRequest {
    fn feature(&self) -> FeatureId {
        self.form().feature()
    }

    fn validate(&self) -> Result<()> {
        self.form().validate()
    }

    fn task_prompt(&self) -> String {
        self.form().task_prompt()
    }

    fn use_web_grounding(&self) -> bool {
        self.form().use_web_grounding()
    }

    fn empty_placeholder(&self) -> &'static str {
        self.form().empty_placeholder()
    }
}
