//! Name to id lookups against the records API.
//!
//! Both lookups take the first row the filtered list returns. The backend
//! filter decides what "matches" means; ambiguous names are not
//! disambiguated here.

use serde::Deserialize;

use crate::services::api::AcademicApi;

#[derive(Deserialize)]
struct IdOnly {
    id: i64,
}

pub async fn resolve_professor_id(api: &dyn AcademicApi, name: &str) -> Option<i64> {
    first_id(api, "professores/", name).await
}

pub async fn resolve_subject_id(api: &dyn AcademicApi, name: &str) -> Option<i64> {
    first_id(api, "materias/", name).await
}

async fn first_id(api: &dyn AcademicApi, path: &str, name: &str) -> Option<i64> {
    let resp = match api.get(path, &[("nome", name)]).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(error = %e, path, name, "name lookup failed");
            return None;
        }
    };

    if resp.status != 200 {
        tracing::debug!(status = resp.status, path, name, "name lookup rejected");
        return None;
    }

    let rows: Vec<IdOnly> = resp.json().ok()?;
    let id = rows.first().map(|row| row.id);
    tracing::debug!(path, name, ?id, candidates = rows.len(), "resolved name");
    id
}
