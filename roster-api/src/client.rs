//! Remote school-administration service: the [`SchoolApi`] seam and its
//! blocking HTTP implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use roster_core::{ClassId, LevelId, PersonaId};

use crate::envelope::{decode_ack, decode_data, decode_level_roster, decode_staff, RemoteClass};
use crate::error::ApiError;

/// Role filter for teacher staff entries.
pub const TEACHER_ROLE: &str = "PROF";

/// Tenant scope every call is made under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub empresa_id: u64,
    pub ciclo_id: u64,
    pub colegio_id: u64,
}

/// Operations the reconciliation engine needs from the remote service.
///
/// Reads return typed payloads; mutations return `Ok(())` on
/// acknowledgement. Every failure is an [`ApiError`].
pub trait SchoolApi {
    /// Every class of the school in the current cycle.
    fn list_classes(&self) -> Result<Vec<RemoteClass>, ApiError>;

    /// Persona ids holding the teacher role on a class.
    fn class_staff(&self, class: ClassId) -> Result<BTreeSet<PersonaId>, ApiError>;

    fn add_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError>;

    fn remove_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError>;

    /// Teacher roster of one level with each persona's active flag.
    fn level_roster(&self, level: LevelId) -> Result<BTreeMap<PersonaId, bool>, ApiError>;

    fn set_level_active(
        &self,
        persona: PersonaId,
        level: LevelId,
        active: bool,
    ) -> Result<(), ApiError>;

    /// Replace the persona's level set.
    fn assign_levels(&self, persona: PersonaId, levels: &BTreeSet<LevelId>)
        -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// URL layout
// ---------------------------------------------------------------------------

/// URL builder for the two endpoint families (`gestionEscolar`, `censo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    scope: Scope,
}

impl Endpoints {
    pub fn new(base_url: &str, scope: Scope) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            scope,
        }
    }

    fn gestion(&self) -> String {
        format!(
            "{}/gestionEscolar/empresas/{}/ciclos/{}",
            self.base_url, self.scope.empresa_id, self.scope.ciclo_id
        )
    }

    fn censo(&self) -> String {
        format!(
            "{}/censo/empresas/{}/ciclos/{}/colegios/{}",
            self.base_url, self.scope.empresa_id, self.scope.ciclo_id, self.scope.colegio_id
        )
    }

    /// `GET …/clases?colegioId=`
    pub fn classes(&self) -> String {
        format!("{}/clases", self.gestion())
    }

    /// `GET|POST …/clases/{id}/staff`
    pub fn class_staff(&self, class: ClassId) -> String {
        format!("{}/clases/{class}/staff", self.gestion())
    }

    /// `DELETE …/clases/{id}/staff/{persona}`
    pub fn class_staff_member(&self, class: ClassId, persona: PersonaId) -> String {
        format!("{}/{persona}", self.class_staff(class))
    }

    /// `GET …/niveles/{nivel}/profesores`
    pub fn level_roster(&self, level: LevelId) -> String {
        format!("{}/niveles/{level}/profesores", self.censo())
    }

    /// `PUT …/niveles/{nivel}/profesores/{persona}/activarInactivar`
    pub fn level_activation(&self, level: LevelId, persona: PersonaId) -> String {
        format!("{}/{persona}/activarInactivar", self.level_roster(level))
    }

    /// `PUT …/profesores/{persona}/asignarNivel`
    pub fn level_assignment(&self, persona: PersonaId) -> String {
        format!("{}/profesores/{persona}/asignarNivel", self.censo())
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blocking [`SchoolApi`] over one `ureq::Agent`.
pub struct HttpSchoolApi {
    agent: ureq::Agent,
    endpoints: Endpoints,
    token: String,
}

impl HttpSchoolApi {
    pub fn new(base_url: &str, token: &str, scope: Scope, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoints: Endpoints::new(base_url, scope),
            token: token.to_string(),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
    }

    /// Send and read the full response, treating error statuses as
    /// responses so the envelope decoder can extract their message.
    fn send(
        &self,
        request: ureq::Request,
        body: Option<serde_json::Value>,
    ) -> Result<(u16, String), ApiError> {
        let method = request.method().to_string();
        let url = request.url().to_string();
        tracing::debug!("{method} {url}");
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(ApiError::Transport {
                    endpoint: url,
                    message: transport.to_string(),
                })
            }
        };
        let status = response.status();
        let text = response.into_string().map_err(|e| ApiError::Transport {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("{method} {url} -> {status}");
        Ok((status, text))
    }
}

impl SchoolApi for HttpSchoolApi {
    fn list_classes(&self) -> Result<Vec<RemoteClass>, ApiError> {
        let url = self.endpoints.classes();
        let request = self
            .request("GET", &url)
            .query("colegioId", &self.endpoints.scope.colegio_id.to_string());
        let (status, body) = self.send(request, None)?;
        decode_data(&url, status, &body)
    }

    fn class_staff(&self, class: ClassId) -> Result<BTreeSet<PersonaId>, ApiError> {
        let url = self.endpoints.class_staff(class);
        let request = self.request("GET", &url).query("rolClave", TEACHER_ROLE);
        let (status, body) = self.send(request, None)?;
        decode_staff(&url, status, &body)
    }

    fn add_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError> {
        let url = self.endpoints.class_staff(class);
        let payload = json!({ "rolClave": TEACHER_ROLE, "personaId": persona.0 });
        let (status, body) = self.send(self.request("POST", &url), Some(payload))?;
        decode_ack(status, &body)
    }

    fn remove_class_staff(&self, class: ClassId, persona: PersonaId) -> Result<(), ApiError> {
        let url = self.endpoints.class_staff_member(class, persona);
        let (status, body) = self.send(self.request("DELETE", &url), None)?;
        decode_ack(status, &body)
    }

    fn level_roster(&self, level: LevelId) -> Result<BTreeMap<PersonaId, bool>, ApiError> {
        let url = self.endpoints.level_roster(level);
        let (status, body) = self.send(self.request("GET", &url), None)?;
        decode_level_roster(&url, status, &body)
    }

    fn set_level_active(
        &self,
        persona: PersonaId,
        level: LevelId,
        active: bool,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.level_activation(level, persona);
        let payload = json!({ "activo": u8::from(active) });
        let (status, body) = self.send(self.request("PUT", &url), Some(payload))?;
        decode_ack(status, &body)
    }

    fn assign_levels(
        &self,
        persona: PersonaId,
        levels: &BTreeSet<LevelId>,
    ) -> Result<(), ApiError> {
        let url = self.endpoints.level_assignment(persona);
        let niveles: Vec<_> = levels.iter().map(|l| json!({ "nivelId": l.0 })).collect();
        let payload = json!({ "niveles": niveles });
        let (status, body) = self.send(self.request("PUT", &url), Some(payload))?;
        decode_ack(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(
            "https://api.test/pegasus-api/",
            Scope {
                empresa_id: 11,
                ciclo_id: 207,
                colegio_id: 4321,
            },
        )
    }

    #[test]
    fn class_urls() {
        let e = endpoints();
        assert_eq!(
            e.classes(),
            "https://api.test/pegasus-api/gestionEscolar/empresas/11/ciclos/207/clases"
        );
        assert_eq!(
            e.class_staff_member(ClassId(9), PersonaId(500)),
            "https://api.test/pegasus-api/gestionEscolar/empresas/11/ciclos/207/clases/9/staff/500"
        );
    }

    #[test]
    fn censo_urls() {
        let e = endpoints();
        assert_eq!(
            e.level_activation(LevelId(39), PersonaId(500)),
            "https://api.test/pegasus-api/censo/empresas/11/ciclos/207/colegios/4321/niveles/39/profesores/500/activarInactivar"
        );
        assert_eq!(
            e.level_assignment(PersonaId(500)),
            "https://api.test/pegasus-api/censo/empresas/11/ciclos/207/colegios/4321/profesores/500/asignarNivel"
        );
    }
}
