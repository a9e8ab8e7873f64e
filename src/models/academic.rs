use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub professor: Option<i64>,
    #[serde(default)]
    pub carga_horaria: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professor {
    pub id: i64,
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub departamento: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub materia: Option<i64>,
    pub data: String,
    pub hora_inicio: String,
    pub hora_fim: String,
    #[serde(default)]
    pub confirmada: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubject {
    pub nome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carga_horaria: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professor: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProfessor {
    pub nome: String,
    pub email: String,
    pub departamento: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReservation {
    pub materia: i64,
    pub data: String,
    pub hora_inicio: String,
    pub hora_fim: String,
    pub confirmada: bool,
}

/// Just enough of a create response to report the new record's id.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    pub id: Option<i64>,
}
