use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::errors::ApiError;
use crate::models::{
    ActionResult, Created, ExtractedIntent, Intent, NewProfessor, NewReservation, NewSubject,
    Parameters, Professor, Reservation, Subject,
};
use crate::services::api::{AcademicApi, ApiResponse};
use crate::services::resolver::{resolve_professor_id, resolve_subject_id};

pub const API_OFFLINE: &str =
    "Erro: A API de registros acadêmicos está offline. Inicie o servidor.";

const DEFAULT_START: &str = "10:00";
const DEFAULT_END: &str = "12:00";

static RESERVATION_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}))?$").expect("Invalid reservation date regex")
});

/// Runs the handler for `extracted.intent`. `today` supplies the year for
/// reservation dates given as day/month.
pub async fn dispatch(
    api: &dyn AcademicApi,
    extracted: &ExtractedIntent,
    today: NaiveDate,
) -> ActionResult {
    let params = &extracted.parameters;
    match extracted.intent {
        Intent::ListSubjects => list_subjects(api).await,
        Intent::CreateSubject => create_subject(api, params).await,
        Intent::UpdateSubject => update_subject(params),
        Intent::DeleteSubject => delete_subject(params),
        Intent::ListProfessors => list_professors(api).await,
        Intent::CreateProfessor => create_professor(api, params).await,
        Intent::DeleteProfessor => delete_professor(params),
        Intent::ReserveLab => reserve_lab(api, params, today).await,
        Intent::ListReservations => list_reservations(api).await,
        Intent::DeleteReservation => delete_reservation(api, params).await,
        Intent::Other => ActionResult::bad_request(
            "Intenção não reconhecida ou fora do escopo do assistente.",
        ),
    }
}

fn api_failure(action: &str, err: ApiError) -> ActionResult {
    match err {
        ApiError::Offline(detail) => {
            tracing::error!(%detail, "records API is offline");
            ActionResult::new(API_OFFLINE, 500)
        }
        ApiError::Rejected { status, body } => {
            tracing::warn!(status, %body, "records API rejected request");
            ActionResult::new(format!("Erro ao {action} (Status {status}): {body}"), status)
        }
        ApiError::Transport(detail) => {
            tracing::error!(%detail, "records API transport error");
            ActionResult::new(format!("Erro ao {action}: {detail}"), 500)
        }
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn record_id(params: &Parameters) -> Option<i64> {
    params.id.filter(|id| *id > 0)
}

fn created_id(resp: &ApiResponse) -> String {
    resp.json::<Created>()
        .ok()
        .and_then(|c| c.id)
        .map_or_else(|| "?".to_string(), |id| id.to_string())
}

async fn fetch_list<T: DeserializeOwned>(
    api: &dyn AcademicApi,
    path: &str,
) -> Result<Vec<T>, ApiError> {
    api.get(path, &[]).await?.error_for_status()?.json()
}

async fn create(
    api: &dyn AcademicApi,
    path: &str,
    body: &serde_json::Value,
) -> Result<ApiResponse, ApiError> {
    api.post(path, body).await?.error_for_status()
}

async fn list_subjects(api: &dyn AcademicApi) -> ActionResult {
    let subjects: Vec<Subject> = match fetch_list(api, "materias/").await {
        Ok(subjects) => subjects,
        Err(e) => return api_failure("listar matérias", e),
    };

    if subjects.is_empty() {
        return ActionResult::ok("Não há matérias cadastradas no momento.");
    }

    let lines: Vec<String> = subjects
        .iter()
        .map(|s| {
            let professor = s
                .professor
                .map_or_else(|| "Professor: N/A".to_string(), |id| format!("Prof ID: {id}"));
            let hours = s
                .carga_horaria
                .map_or_else(|| "N/D".to_string(), |h| format!("{h}h"));
            format!("ID: {} | Matéria: {} | {} | Carga: {}", s.id, s.nome, professor, hours)
        })
        .collect();

    ActionResult::ok(format!("Matérias cadastradas:\n{}", lines.join("\n")))
}

async fn create_subject(api: &dyn AcademicApi, params: &Parameters) -> ActionResult {
    let Some(name) = text(&params.nome) else {
        return ActionResult::bad_request("Erro: O nome da matéria é obrigatório para o cadastro.");
    };

    let mut professor_id = None;
    if let Some(professor) = text(&params.professor) {
        match resolve_professor_id(api, professor).await {
            Some(id) => professor_id = Some(id),
            None => {
                return ActionResult::not_found(format!(
                    "Professor '{professor}' não encontrado no sistema. Cadastre o professor primeiro \
                     (ex: cadastre o professor {professor}, email: x, departamento de y)."
                ))
            }
        }
    }

    let payload = NewSubject {
        nome: name.to_string(),
        carga_horaria: params.carga_horaria.filter(|h| *h != 0),
        professor: professor_id,
    };

    match create(api, "materias/", &json!(payload)).await {
        Ok(resp) => ActionResult::created(format!(
            "Matéria '{name}' cadastrada com sucesso! (ID: {})",
            created_id(&resp)
        )),
        Err(e) => api_failure("cadastrar matéria", e),
    }
}

fn update_subject(params: &Parameters) -> ActionResult {
    let Some(id) = record_id(params) else {
        return ActionResult::bad_request("Erro: ID da matéria é obrigatório para atualização.");
    };
    ActionResult::bad_request(format!(
        "Atualizar matéria (ID {id}): intenção detectada, mas a atualização ainda não foi implementada."
    ))
}

fn delete_subject(params: &Parameters) -> ActionResult {
    let Some(id) = record_id(params) else {
        return ActionResult::bad_request("Erro: ID da matéria é obrigatório para exclusão.");
    };
    ActionResult::bad_request(format!(
        "Excluir matéria (ID {id}): intenção detectada, mas a exclusão ainda não foi implementada."
    ))
}

async fn list_professors(api: &dyn AcademicApi) -> ActionResult {
    let professors: Vec<Professor> = match fetch_list(api, "professores/").await {
        Ok(professors) => professors,
        Err(e) => return api_failure("listar professores", e),
    };

    if professors.is_empty() {
        return ActionResult::ok("Não há professores cadastrados no momento.");
    }

    let lines: Vec<String> = professors
        .iter()
        .map(|p| {
            format!(
                "ID: {} | Professor: {} | E-mail: {} | Depto: {}",
                p.id, p.nome, p.email, p.departamento
            )
        })
        .collect();

    ActionResult::ok(format!("Professores cadastrados:\n{}", lines.join("\n")))
}

async fn create_professor(api: &dyn AcademicApi, params: &Parameters) -> ActionResult {
    let name = text(&params.nome);
    let email = text(&params.email);
    let department = text(&params.departamento);

    let (Some(name), Some(email), Some(department)) = (name, email, department) else {
        let missing: Vec<&str> = [("nome", name), ("email", email), ("departamento", department)]
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(field, _)| *field)
            .collect();
        return ActionResult::bad_request(format!(
            "Erro: Faltam dados essenciais para cadastrar o professor: {}. Tente reformular a frase.",
            missing.join(", ")
        ));
    };

    let payload = NewProfessor {
        nome: name.to_string(),
        email: email.to_string(),
        departamento: department.to_string(),
    };

    match create(api, "professores/", &json!(payload)).await {
        Ok(resp) => ActionResult::created(format!(
            "Professor '{name}' do departamento '{department}' cadastrado com sucesso! (ID: {})",
            created_id(&resp)
        )),
        Err(e) => api_failure("cadastrar professor", e),
    }
}

fn delete_professor(params: &Parameters) -> ActionResult {
    let Some(id) = record_id(params) else {
        return ActionResult::bad_request("Erro: ID do professor é obrigatório para exclusão.");
    };
    ActionResult::bad_request(format!(
        "Excluir professor (ID {id}): intenção detectada, mas a exclusão ainda não foi implementada."
    ))
}

/// Accepts `D/M/YYYY`, or `D/M` in `current_year`.
/// Two-digit years are rejected.
pub fn parse_reservation_date(value: &str, current_year: i32) -> Option<NaiveDate> {
    let caps = RESERVATION_DATE_RE.captures(value.trim())?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(year) => year.as_str().parse().ok()?,
        None => current_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

async fn reserve_lab(api: &dyn AcademicApi, params: &Parameters, today: NaiveDate) -> ActionResult {
    let subject = text(&params.materia_nome);
    let date_str = text(&params.data);

    let (Some(subject), Some(date_str)) = (subject, date_str) else {
        let missing: Vec<&str> = [("nome da matéria", subject), ("data", date_str)]
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(field, _)| *field)
            .collect();
        return ActionResult::bad_request(format!(
            "Erro: Faltam dados para a reserva: {}.",
            missing.join(", ")
        ));
    };
    let start_str = text(&params.hora_inicio).unwrap_or(DEFAULT_START);
    let end_str = text(&params.hora_fim).unwrap_or(DEFAULT_END);

    let Some(date) = parse_reservation_date(date_str, today.year()) else {
        return ActionResult::bad_request(format!(
            "Erro na formatação da data '{date_str}'. Use DD/MM ou DD/MM/AAAA."
        ));
    };
    let (Ok(start), Ok(end)) = (
        NaiveTime::parse_from_str(start_str, "%H:%M"),
        NaiveTime::parse_from_str(end_str, "%H:%M"),
    ) else {
        return ActionResult::bad_request(format!(
            "Erro na formatação do horário ('{start_str}' - '{end_str}'). Use HH:MM."
        ));
    };

    if start >= end {
        return ActionResult::bad_request("Erro: A hora de início deve ser anterior à hora de fim.");
    }

    let Some(subject_id) = resolve_subject_id(api, subject).await else {
        return ActionResult::not_found(format!(
            "Matéria '{subject}' não encontrada. Verifique o nome e tente novamente."
        ));
    };

    let payload = NewReservation {
        materia: subject_id,
        data: date.format("%Y-%m-%d").to_string(),
        hora_inicio: start.format("%H:%M:%S").to_string(),
        hora_fim: end.format("%H:%M:%S").to_string(),
        confirmada: true,
    };

    match create(api, "reservas/", &json!(payload)).await {
        Ok(resp) => ActionResult::created(format!(
            "Reserva do laboratório para '{subject}' em {date_str} das {start_str} às {end_str} criada com sucesso! (ID: {})",
            created_id(&resp)
        )),
        Err(e) => api_failure("criar reserva", e),
    }
}

async fn list_reservations(api: &dyn AcademicApi) -> ActionResult {
    let reservations: Vec<Reservation> = match fetch_list(api, "reservas/").await {
        Ok(reservations) => reservations,
        Err(e) => return api_failure("listar reservas", e),
    };

    if reservations.is_empty() {
        return ActionResult::ok("Não há reservas de laboratório cadastradas no momento.");
    }

    let hhmm = |t: &str| t.chars().take(5).collect::<String>();
    let lines: Vec<String> = reservations
        .iter()
        .map(|r| {
            let subject = r
                .materia
                .map_or_else(|| "N/A".to_string(), |id| id.to_string());
            format!(
                "ID: {} | Matéria ID: {} | Data: {} | Horário: {} - {}",
                r.id,
                subject,
                r.data,
                hhmm(&r.hora_inicio),
                hhmm(&r.hora_fim)
            )
        })
        .collect();

    ActionResult::ok(format!(
        "Reservas de laboratório cadastradas:\n{}",
        lines.join("\n")
    ))
}

async fn delete_reservation(api: &dyn AcademicApi, params: &Parameters) -> ActionResult {
    let Some(id) = record_id(params) else {
        return ActionResult::bad_request(
            "Erro: Você precisa informar o ID da reserva a ser excluída. Exemplo: 'apagar a reserva ID 5'.",
        );
    };

    let resp = match api.delete(&format!("reservas/{id}/")).await {
        Ok(resp) => resp,
        Err(e) => return api_failure("excluir reserva", e),
    };

    match resp.status {
        404 => ActionResult::not_found(format!("Erro: Reserva ID {id} não encontrada.")),
        status if resp.is_success() => {
            ActionResult::new(format!("Reserva ID {id} excluída com sucesso!"), status)
        }
        status => api_failure(
            "excluir reserva",
            ApiError::Rejected {
                status,
                body: resp.body,
            },
        ),
    }
}
