use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::models::{ExtractedIntent, Intent, PartialIntent};
use crate::services::ai::LlmProvider;

const SYSTEM_PROMPT: &str = r#"Você é um sistema de extração de intenção para um assistente acadêmico.
Sua ÚNICA função é retornar EXATAMENTE um objeto JSON válido, aderindo estritamente ao esquema de resposta.
Responda APENAS com o JSON, sem markdown (como ```json) ou qualquer texto adicional.

Intenções permitidas:
'listar_materias', 'cadastrar_materia', 'atualizar_materia', 'excluir_materia',
'listar_professores', 'cadastrar_professor', 'excluir_professor',
'reservar_laboratorio', 'listar_reservas', 'excluir_reserva',
'outra'

Regras de extração de parâmetros:
- Para 'reservar_laboratorio', extraia: {"materia_nome": "...", "data": "DD/MM ou DD/MM/AAAA", "hora_inicio": "HH:MM", "hora_fim": "HH:MM"}
- Para operações de matéria, use: 'id', 'nome', 'professor', 'carga_horaria'.
- Para professor, use: 'nome', 'email', 'departamento'.
- Para 'excluir_reserva', o 'id' é obrigatório.
"#;

/// Prefixes that map straight to an intent without asking the model.
const SIMPLE_COMMANDS: &[(&str, Intent)] = &[
    ("listar", Intent::ListSubjects),
    ("lista", Intent::ListSubjects),
    ("ver", Intent::ListSubjects),
    ("crie a matéria", Intent::CreateSubject),
    ("cadastrar materia", Intent::CreateSubject),
    ("excluir materia", Intent::DeleteSubject),
    ("atualizar materia", Intent::UpdateSubject),
    ("cadastrar professor", Intent::CreateProfessor),
    ("cadastre o professor", Intent::CreateProfessor),
    ("criar professor", Intent::CreateProfessor),
    ("excluir professor", Intent::DeleteProfessor),
    ("listar professores", Intent::ListProfessors),
    ("falar professores", Intent::ListProfessors),
    ("reservar", Intent::ReserveLab),
    ("listar reservas", Intent::ListReservations),
    ("reservas", Intent::ListReservations),
    ("apagar reserva", Intent::DeleteReservation),
    ("deletar reserva", Intent::DeleteReservation),
    ("excluir reserva", Intent::DeleteReservation),
];

/// Words that mean the message carries parameters, so the shortcut is skipped.
const PARAMETER_MARKERS: &[&str] = &["id", "professor", "materia"];

static SUBJECT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:matéria|disciplina)\s*(['"]?)\s*(.+?)\s*(['"]?)\s*(?:\be\s*vincule|\bcom\s*o\s*professor|\bou\b|$)"#,
    )
    .expect("Invalid subject name regex")
});

static SUBJECT_PROFESSOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"professor\s*(['"].+?['"]|[\w\s]+?)\s*(?:\be\b|\bcarga\b|\bou\b|$)"#)
        .expect("Invalid subject professor regex")
});

static CREDIT_HOURS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:hora|h)").expect("Invalid credit hours regex"));

static ID_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^id\s*\d+").expect("Invalid id token regex"));

static ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:id\s*|#\s*)(\d+)|(?:\s|^)(\d+)(?:\s|$)").expect("Invalid id regex")
});

static PROFESSOR_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"professor\s*([^,]+?)(?:,|$|\scom)").expect("Invalid professor name regex")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})").expect("Invalid email regex")
});

static DEPARTMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:departamento\s*de|depto\s*de)\s*([^,.\s]+)").expect("Invalid department regex")
});

static RESERVATION_SUBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"matéria\s*['"]?\s*([^,]+?)(?:\s+no\s+dia|\s+em|\s+das|\s*$)"#)
        .expect("Invalid reservation subject regex")
});

/// A captured "subject name" that is really a date, time or connector.
static RESERVATION_NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\d+/\d+|\d+:\d+|dia|das|em)").expect("Invalid reservation noise regex")
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:dia|em)\s*(\d{1,2}/\d{1,2}(?:/\d{4})?)").expect("Invalid date regex")
});

static HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"das\s*(\d{1,2}:\d{2})\s*às\s*(\d{1,2}:\d{2})").expect("Invalid hours regex")
});

type FallbackStage = fn(&str, &ExtractedIntent) -> Option<PartialIntent>;

/// Run in order after the model call; later stages win field by field.
const FALLBACK_STAGES: &[(&str, FallbackStage)] = &[
    ("subject", subject_stage as FallbackStage),
    ("professor_registration", professor_registration_stage as FallbackStage),
    ("reservation", reservation_stage as FallbackStage),
];

/// Turns a free-text request into an intent and its parameters.
///
/// Never fails: if the model call errors out or times out the working result
/// is `outra` and the pattern stages still run.
pub async fn extract_intent(
    llm: &dyn LlmProvider,
    user_text: &str,
    timeout: Duration,
) -> ExtractedIntent {
    let text = normalize(user_text);

    if let Some(intent) = simple_command(&text) {
        tracing::debug!(intent = intent.as_str(), "matched simple command");
        return ExtractedIntent::new(intent);
    }

    let mut extracted = match ask_model(llm, user_text, timeout).await {
        Ok(extracted) => extracted,
        Err(e) => {
            tracing::warn!(error = %e, "AI extraction failed, using pattern fallbacks");
            ExtractedIntent::default()
        }
    };

    for (name, stage) in FALLBACK_STAGES {
        if let Some(partial) = stage(&text, &extracted) {
            tracing::debug!(stage = *name, ?partial, "fallback stage matched");
            extracted.apply(partial);
        }
    }

    extracted
}

pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace('\u{a0}', " ").trim().to_string()
}

fn simple_command(text: &str) -> Option<Intent> {
    if PARAMETER_MARKERS.iter().any(|w| text.contains(w)) {
        return None;
    }

    SIMPLE_COMMANDS
        .iter()
        .filter(|(prefix, _)| text.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, intent)| *intent)
}

fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intencao": { "type": "string" },
            "parametros": {
                "type": "object",
                "properties": {
                    "id": { "type": "number" },
                    "nome": { "type": "string" },
                    "professor": { "type": "string" },
                    "carga_horaria": { "type": "number" },
                    "email": { "type": "string" },
                    "departamento": { "type": "string" },
                    "materia_nome": { "type": "string" },
                    "data": { "type": "string" },
                    "hora_inicio": { "type": "string" },
                    "hora_fim": { "type": "string" },
                },
            },
        },
        "required": ["intencao", "parametros"],
    })
}

async fn ask_model(
    llm: &dyn LlmProvider,
    user_text: &str,
    timeout: Duration,
) -> anyhow::Result<ExtractedIntent> {
    let prompt = format!("{SYSTEM_PROMPT}\n\nMENSAGEM DO USUÁRIO: \"{user_text}\"");
    let schema = response_schema();

    let response = tokio::time::timeout(timeout, llm.generate_json(&prompt, &schema))
        .await
        .map_err(|_| anyhow::anyhow!("model call timed out after {timeout:?}"))??;

    parse_model_response(&response)
}

fn parse_model_response(response: &str) -> anyhow::Result<ExtractedIntent> {
    if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(response) {
        return Ok(extracted);
    }

    // Strip markdown code fences
    let trimmed = response.trim();
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(cleaned) {
        return Ok(extracted);
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if start < end {
            if let Ok(extracted) = serde_json::from_str::<ExtractedIntent>(&cleaned[start..=end]) {
                return Ok(extracted);
            }
        }
    }

    anyhow::bail!("model response is not an intent object: {response}")
}

fn strip_quotes(s: &str) -> String {
    s.replace(['\'', '"'], "")
}

/// Subject name, professor, credit hours and the record id.
fn subject_stage(text: &str, current: &ExtractedIntent) -> Option<PartialIntent> {
    if current.intent != Intent::Other && !text.contains("materia") && !text.contains("disciplina")
    {
        return None;
    }

    let mut partial = PartialIntent::default();

    if text.contains("cadastrar") || text.contains("crie") {
        partial.intent = Some(Intent::CreateSubject);
    }

    let working = partial.intent.unwrap_or(current.intent);
    if matches!(working, Intent::UpdateSubject | Intent::CreateSubject) {
        if let Some(caps) = SUBJECT_NAME_RE.captures(text) {
            let name = strip_quotes(caps[2].trim());
            let name = name.trim();
            if !name.is_empty()
                && !ID_TOKEN_RE.is_match(name)
                && !name.chars().all(char::is_numeric)
            {
                partial.parameters.nome = Some(name.to_string());
            }
        }

        if let Some(caps) = SUBJECT_PROFESSOR_RE.captures(text) {
            let professor = strip_quotes(caps[1].trim());
            let professor = professor.trim();
            if professor.chars().count() > 2 {
                partial.parameters.professor = Some(professor.to_string());
            }
        }

        if let Some(caps) = CREDIT_HOURS_RE.captures(text) {
            if let Ok(hours) = caps[1].parse() {
                partial.parameters.carga_horaria = Some(hours);
            }
        }
    }

    if let Some(id) = find_id(text) {
        partial.parameters.id = Some(id);
        if let Some(intent) = intent_for_id(text) {
            partial.intent = Some(intent);
        }
    }

    (!partial.is_empty()).then_some(partial)
}

/// First `id N`, `#N` or standalone number in the text. Zero is ignored.
fn find_id(text: &str) -> Option<i64> {
    let caps = ID_RE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|id| *id != 0)
}

fn intent_for_id(text: &str) -> Option<Intent> {
    let has = |w: &str| text.contains(w);

    if has("atualizar") && has("materia") {
        Some(Intent::UpdateSubject)
    } else if has("excluir") && has("materia") {
        Some(Intent::DeleteSubject)
    } else if has("excluir") && has("professor") {
        Some(Intent::DeleteProfessor)
    } else if (has("apagar") || has("deletar") || has("excluir")) && has("reserva") {
        Some(Intent::DeleteReservation)
    } else {
        None
    }
}

fn professor_registration_stage(text: &str, _current: &ExtractedIntent) -> Option<PartialIntent> {
    if !(text.contains("professor") && text.contains("cadastr")) {
        return None;
    }

    let mut partial = PartialIntent {
        intent: Some(Intent::CreateProfessor),
        ..Default::default()
    };

    if let Some(caps) = PROFESSOR_NAME_RE.captures(text) {
        partial.parameters.nome = Some(caps[1].trim().to_string());
    }
    if let Some(caps) = EMAIL_RE.captures(text) {
        partial.parameters.email = Some(caps[1].trim().to_string());
    }
    if let Some(caps) = DEPARTMENT_RE.captures(text) {
        partial.parameters.departamento = Some(caps[1].trim().to_string());
    }

    Some(partial)
}

fn reservation_stage(text: &str, current: &ExtractedIntent) -> Option<PartialIntent> {
    if current.intent != Intent::ReserveLab && !text.contains("reservar") {
        return None;
    }

    let mut partial = PartialIntent {
        intent: Some(Intent::ReserveLab),
        ..Default::default()
    };

    if let Some(caps) = RESERVATION_SUBJECT_RE.captures(text) {
        let name = caps[1].trim().trim_matches(['\'', '"']).trim();
        if !name.is_empty() && !RESERVATION_NOISE_RE.is_match(name) {
            partial.parameters.materia_nome = Some(name.to_string());
        }
    }

    if let Some(caps) = DATE_RE.captures(text) {
        partial.parameters.data = Some(caps[1].to_string());
    }

    if let Some(caps) = HOURS_RE.captures(text) {
        partial.parameters.hora_inicio = Some(caps[1].to_string());
        partial.parameters.hora_fim = Some(caps[2].to_string());
    }

    Some(partial)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Replies with a fixed body (or fails when `None`) and counts calls.
    struct MockLlm {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl MockLlm {
        fn failing() -> Self {
            Self {
                reply: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        async fn generate_json(&self, _prompt: &str, _schema: &Value) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("connection reset"),
            }
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn generate_json(&self, _prompt: &str, _schema: &Value) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(r#"{"intencao":"listar_professores","parametros":{}}"#.to_string())
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Listar\u{a0}Matérias \n"), "listar matérias");
    }

    #[tokio::test]
    async fn test_simple_command_skips_model() {
        let llm = MockLlm::failing();
        let result = extract_intent(&llm, "Listar", TIMEOUT).await;
        assert_eq!(result.intent, Intent::ListSubjects);
        assert!(result.parameters.is_empty());
        assert_eq!(llm.calls(), 0);

        let result = extract_intent(&llm, "excluir reserva", TIMEOUT).await;
        assert_eq!(result.intent, Intent::DeleteReservation);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_longest_simple_command_wins() {
        let llm = MockLlm::failing();
        let result = extract_intent(&llm, "listar reservas", TIMEOUT).await;
        assert_eq!(result.intent, Intent::ListReservations);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_parameter_marker_disables_shortcut() {
        let llm = MockLlm::replying(r#"{"intencao":"listar_professores","parametros":{}}"#);
        let result = extract_intent(&llm, "listar professores", TIMEOUT).await;
        assert_eq!(result.intent, Intent::ListProfessors);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_subject_by_id_without_model() {
        let llm = MockLlm::failing();
        let result = extract_intent(&llm, "excluir materia id 7", TIMEOUT).await;
        assert_eq!(result.intent, Intent::DeleteSubject);
        assert_eq!(result.parameters.id, Some(7));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_reservation_by_hash_id() {
        let llm = MockLlm::failing();
        let result = extract_intent(&llm, "por favor apague a reserva #12", TIMEOUT).await;
        // "apague" is not a trigger word, so only the id is extracted
        assert_eq!(result.intent, Intent::Other);
        assert_eq!(result.parameters.id, Some(12));

        let result = extract_intent(&llm, "quero deletar a reserva #12", TIMEOUT).await;
        assert_eq!(result.intent, Intent::DeleteReservation);
        assert_eq!(result.parameters.id, Some(12));
    }

    #[tokio::test]
    async fn test_model_result_is_used() {
        let llm = MockLlm::replying(
            "```json\n{\"intencao\":\"listar_professores\",\"parametros\":{}}\n```",
        );
        let result = extract_intent(&llm, "quais docentes temos?", TIMEOUT).await;
        assert_eq!(result.intent, Intent::ListProfessors);
        assert!(result.parameters.is_empty());
    }

    #[tokio::test]
    async fn test_model_timeout_falls_back() {
        let result = extract_intent(
            &SlowLlm,
            "quero deletar a reserva id 3",
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(result.intent, Intent::DeleteReservation);
        assert_eq!(result.parameters.id, Some(3));
    }

    #[tokio::test]
    async fn test_fallback_overrides_model_intent() {
        let llm = MockLlm::replying(
            r#"{"intencao":"listar_materias","parametros":{"nome":"algebra"}}"#,
        );
        let result = extract_intent(&llm, "atualizar a materia id 4", TIMEOUT).await;
        assert_eq!(result.intent, Intent::UpdateSubject);
        assert_eq!(result.parameters.id, Some(4));
        assert_eq!(result.parameters.nome.as_deref(), Some("algebra"));
    }

    #[tokio::test]
    async fn test_unknown_model_tag_still_runs_fallbacks() {
        let llm = MockLlm::replying(r#"{"intencao":"pedir_pizza","parametros":{}}"#);
        let result = extract_intent(&llm, "quero deletar a reserva id 8", TIMEOUT).await;
        assert_eq!(result.intent, Intent::DeleteReservation);
        assert_eq!(result.parameters.id, Some(8));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_create_subject_fallback() {
        let llm = MockLlm::failing();
        let result = extract_intent(
            &llm,
            "Crie a disciplina Cálculo com o professor Ana Souza e carga de 60 horas",
            TIMEOUT,
        )
        .await;
        assert_eq!(result.intent, Intent::CreateSubject);
        assert_eq!(result.parameters.nome.as_deref(), Some("cálculo"));
        assert_eq!(result.parameters.professor.as_deref(), Some("ana souza"));
        assert_eq!(result.parameters.carga_horaria, Some(60));
    }

    #[tokio::test]
    async fn test_professor_registration_wins_over_subject() {
        let llm = MockLlm::failing();
        let result = extract_intent(
            &llm,
            "cadastrar a disciplina física com o professor ana",
            TIMEOUT,
        )
        .await;
        assert_eq!(result.intent, Intent::CreateProfessor);
        assert_eq!(result.parameters.nome.as_deref(), Some("ana"));
        assert_eq!(result.parameters.professor.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_create_professor_fallback() {
        let llm = MockLlm::failing();
        let result = extract_intent(
            &llm,
            "Cadastrar professor João Silva, email joao.silva@escola.edu.br, departamento de Computação",
            TIMEOUT,
        )
        .await;
        assert_eq!(result.intent, Intent::CreateProfessor);
        assert_eq!(result.parameters.nome.as_deref(), Some("joão silva"));
        assert_eq!(
            result.parameters.email.as_deref(),
            Some("joao.silva@escola.edu.br")
        );
        assert_eq!(result.parameters.departamento.as_deref(), Some("computação"));
    }

    #[test]
    fn test_reservation_stage() {
        let text = normalize("Reservar o laboratório para a matéria 'Redes' no dia 10/05 das 14:00 às 16:00");
        let partial = reservation_stage(&text, &ExtractedIntent::default()).unwrap();
        assert_eq!(partial.intent, Some(Intent::ReserveLab));
        assert_eq!(partial.parameters.materia_nome.as_deref(), Some("redes"));
        assert_eq!(partial.parameters.data.as_deref(), Some("10/05"));
        assert_eq!(partial.parameters.hora_inicio.as_deref(), Some("14:00"));
        assert_eq!(partial.parameters.hora_fim.as_deref(), Some("16:00"));
    }

    #[test]
    fn test_reservation_stage_rejects_date_as_subject() {
        let text = normalize("reservar para a matéria 10/05 das 08:00 às 09:30");
        let partial = reservation_stage(&text, &ExtractedIntent::default()).unwrap();
        assert_eq!(partial.parameters.materia_nome, None);
        assert_eq!(partial.parameters.hora_inicio.as_deref(), Some("08:00"));
        assert_eq!(partial.parameters.hora_fim.as_deref(), Some("09:30"));
    }

    #[test]
    fn test_reservation_stage_ignores_unrelated_text() {
        assert!(reservation_stage("listar professores", &ExtractedIntent::default()).is_none());
    }

    #[tokio::test]
    async fn test_reservation_sentence_end_to_end() {
        let llm = MockLlm::failing();
        let result = extract_intent(
            &llm,
            "Quero reservar o laboratório para a matéria Redes no dia 10/05/2025 das 14:00 às 16:00",
            TIMEOUT,
        )
        .await;
        assert_eq!(result.intent, Intent::ReserveLab);
        assert_eq!(result.parameters.materia_nome.as_deref(), Some("redes"));
        assert_eq!(result.parameters.data.as_deref(), Some("10/05/2025"));
        assert_eq!(result.parameters.hora_inicio.as_deref(), Some("14:00"));
        assert_eq!(result.parameters.hora_fim.as_deref(), Some("16:00"));
    }

    #[test]
    fn test_find_id_prefers_first_alternative() {
        assert_eq!(find_id("excluir reserva id 5 e 9"), Some(5));
        assert_eq!(find_id("excluir professor 42"), Some(42));
        assert_eq!(find_id("excluir professor 0"), None);
        assert_eq!(find_id("sem numero"), None);
    }

    #[test]
    fn test_subject_name_rejects_id_capture() {
        let text = "atualizar materia disciplina id 3";
        let current = ExtractedIntent::new(Intent::UpdateSubject);
        let partial = subject_stage(text, &current).unwrap();
        assert_eq!(partial.parameters.nome, None);
        assert_eq!(partial.parameters.id, Some(3));
        assert_eq!(partial.intent, Some(Intent::UpdateSubject));
    }

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{"intencao":"cadastrar_materia","parametros":{"nome":"Física","carga_horaria":"80"}}"#;
        let result = parse_model_response(json).unwrap();
        assert_eq!(result.intent, Intent::CreateSubject);
        assert_eq!(result.parameters.nome.as_deref(), Some("Física"));
        assert_eq!(result.parameters.carga_horaria, Some(80));
    }

    #[test]
    fn test_parse_embedded_json() {
        let raw = "Claro! {\"intencao\":\"listar_reservas\",\"parametros\":{}} espero ter ajudado";
        let result = parse_model_response(raw).unwrap();
        assert_eq!(result.intent, Intent::ListReservations);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_model_response("não entendi").is_err());
    }
}
