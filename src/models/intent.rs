use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Intent {
    #[serde(rename = "listar_materias")]
    ListSubjects,
    #[serde(rename = "cadastrar_materia")]
    CreateSubject,
    #[serde(rename = "atualizar_materia")]
    UpdateSubject,
    #[serde(rename = "excluir_materia")]
    DeleteSubject,
    #[serde(rename = "listar_professores")]
    ListProfessors,
    #[serde(rename = "cadastrar_professor")]
    CreateProfessor,
    #[serde(rename = "excluir_professor")]
    DeleteProfessor,
    #[serde(rename = "reservar_laboratorio")]
    ReserveLab,
    #[serde(rename = "listar_reservas")]
    ListReservations,
    #[serde(rename = "excluir_reserva")]
    DeleteReservation,
    #[default]
    #[serde(rename = "outra", other)]
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ListSubjects => "listar_materias",
            Intent::CreateSubject => "cadastrar_materia",
            Intent::UpdateSubject => "atualizar_materia",
            Intent::DeleteSubject => "excluir_materia",
            Intent::ListProfessors => "listar_professores",
            Intent::CreateProfessor => "cadastrar_professor",
            Intent::DeleteProfessor => "excluir_professor",
            Intent::ReserveLab => "reservar_laboratorio",
            Intent::ListReservations => "listar_reservas",
            Intent::DeleteReservation => "excluir_reserva",
            Intent::Other => "outra",
        }
    }
}

/// Field values extracted for an intent. Which ones matter depends on the
/// handler that reads them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Parameters {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int"
    )]
    pub id: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub nome: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub professor: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_int"
    )]
    pub carga_horaria: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub email: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub departamento: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub materia_nome: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub data: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub hora_inicio: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_text"
    )]
    pub hora_fim: Option<String>,
}

impl Parameters {
    pub fn is_empty(&self) -> bool {
        *self == Parameters::default()
    }

    /// Overwrites every field for which `other` carries a non-empty value.
    pub fn merge(&mut self, other: Parameters) {
        fn take_int(slot: &mut Option<i64>, value: Option<i64>) {
            if value.is_some() {
                *slot = value;
            }
        }
        fn take_text(slot: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *slot = Some(v);
            }
        }

        take_int(&mut self.id, other.id);
        take_text(&mut self.nome, other.nome);
        take_text(&mut self.professor, other.professor);
        take_int(&mut self.carga_horaria, other.carga_horaria);
        take_text(&mut self.email, other.email);
        take_text(&mut self.departamento, other.departamento);
        take_text(&mut self.materia_nome, other.materia_nome);
        take_text(&mut self.data, other.data);
        take_text(&mut self.hora_inicio, other.hora_inicio);
        take_text(&mut self.hora_fim, other.hora_fim);
    }
}

/// Accepts integers, floats (truncated) and numeric strings; anything else
/// becomes `None` instead of failing the whole document.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Keeps strings and stringifies numbers and booleans; objects, arrays and
/// null become `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedIntent {
    #[serde(rename = "intencao", default)]
    pub intent: Intent,
    #[serde(rename = "parametros", default)]
    pub parameters: Parameters,
}

impl ExtractedIntent {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            parameters: Parameters::default(),
        }
    }
}

/// Output of one extraction stage. `None` fields leave the working result
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialIntent {
    pub intent: Option<Intent>,
    pub parameters: Parameters,
}

impl PartialIntent {
    pub fn is_empty(&self) -> bool {
        self.intent.is_none() && self.parameters.is_empty()
    }
}

impl ExtractedIntent {
    pub fn apply(&mut self, partial: PartialIntent) {
        if let Some(intent) = partial.intent {
            self.intent = intent;
        }
        self.parameters.merge(partial.parameters);
    }
}
