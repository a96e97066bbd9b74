use crate::upstream::FhirClient;
use crate::{RelayError, RelayResult};
use chrono::{DateTime, Utc};
use fhir::{Observation, ObservationDraft, ObservationForm, ObservationQuery, SearchBundle};
use reqwest::StatusCode;
use serde_json::{Map, Value};

/// Result of a successful create, ready to be returned to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedObservation {
    pub status: StatusCode,
    pub body: Value,
}

impl CreatedObservation {
    /// Logical id of the created resource, if the body carries one.
    pub fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(Value::as_str)
    }
}

/// Forwards Observation creates to the FHIR server and normalises its answer.
#[derive(Clone, Debug)]
pub struct ObservationService {
    fhir: FhirClient,
}

impl ObservationService {
    pub fn new(fhir: FhirClient) -> Self {
        Self { fhir }
    }

    /// Create an Observation from a raw JSON request body.
    ///
    /// The token and required fields are checked before the FHIR server is contacted.
    /// The body is forwarded unchanged.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingAccessToken`] if `token` is absent or empty,
    /// - [`RelayError::Json`] if `body` is not JSON,
    /// - [`RelayError::InvalidObservation`] if a required field is missing,
    /// - [`RelayError::NoMatchingObservation`] if the server omitted a location and the
    ///   follow-up search found nothing,
    /// - [`RelayError::Upstream`] for any non-2xx answer.
    pub async fn create(&self, token: Option<&str>, body: &[u8]) -> RelayResult<CreatedObservation> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(RelayError::MissingAccessToken)?;

        let payload: Value = serde_json::from_slice(body)?;
        Observation::check_required(&payload).map_err(RelayError::InvalidObservation)?;

        let response = self.fhir.create_observation(token, body.to_vec()).await?;

        if !response.is_success() {
            let err = response.into_error();
            tracing::error!("Error creating observation: {err}");
            return Err(err);
        }

        let location_id = response
            .location
            .as_deref()
            .and_then(Observation::id_from_location);

        match location_id {
            Some(id) => {
                tracing::info!(observation = %id, "observation created");
                Ok(CreatedObservation {
                    status: response.status,
                    body: with_id(id, &response.body),
                })
            }
            None => {
                tracing::warn!(
                    status = %response.status,
                    "create succeeded without a Location header, searching for the new observation"
                );
                self.find_created(token, &payload).await
            }
        }
    }

    /// Submit a validated draft, timestamping it as issued now.
    pub async fn submit(
        &self,
        token: &str,
        draft: &ObservationDraft,
    ) -> RelayResult<CreatedObservation> {
        self.submit_at(token, draft, Utc::now()).await
    }

    /// Validate entry-form input for `patient_id` and submit it.
    ///
    /// # Errors
    ///
    /// [`RelayError::InvalidForm`] if the input does not validate; nothing is sent
    /// upstream in that case. Otherwise as for [`ObservationService::create`].
    pub async fn submit_form(
        &self,
        token: &str,
        form: &ObservationForm,
        patient_id: &str,
    ) -> RelayResult<CreatedObservation> {
        let draft =
            ObservationDraft::from_form(form, patient_id).map_err(RelayError::InvalidForm)?;
        self.submit(token, &draft).await
    }

    async fn submit_at(
        &self,
        token: &str,
        draft: &ObservationDraft,
        issued: DateTime<Utc>,
    ) -> RelayResult<CreatedObservation> {
        let resource = Observation::render(draft, issued)?;
        let body = serde_json::to_vec(&resource)?;
        self.create(Some(token), &body).await
    }

    // Newest Observation matching the payload's encounter, code and date.
    async fn find_created(&self, token: &str, payload: &Value) -> RelayResult<CreatedObservation> {
        let Some(query) = ObservationQuery::from_payload(payload) else {
            tracing::warn!("payload lacks searchable encounter, code or date, skipping search");
            return Err(RelayError::NoMatchingObservation);
        };
        let response = self.fhir.search_observations(token, &query).await?;
        if !response.is_success() {
            let err = response.into_error();
            tracing::error!("Error searching for created observation: {err}");
            return Err(err);
        }

        let resource = SearchBundle::from_slice(&response.body)?
            .into_first_resource()
            .ok_or(RelayError::NoMatchingObservation)?;

        Ok(CreatedObservation {
            status: StatusCode::CREATED,
            body: resource,
        })
    }
}

// `{id, ...upstream}`: upstream fields win. A body that is not a JSON object yields `{id}`.
fn with_id(id: String, upstream: &[u8]) -> Value {
    let mut merged = Map::new();
    merged.insert("id".to_string(), Value::String(id));

    if let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(upstream) {
        merged.extend(fields);
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::upstream::http_client;
    use chrono::TimeZone;
    use fhir::VitalSign;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(fhir_url: &str) -> ObservationService {
        let cfg = Arc::new(
            RelayConfig::new("https://auth.example", fhir_url, "client-1", None).expect("config"),
        );
        ObservationService::new(FhirClient::new(http_client().expect("client"), cfg))
    }

    fn payload() -> Value {
        json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "8480-6"}]},
            "effectiveDateTime": "2024-01-01T00:00:00Z",
            "encounter": {"reference": "Encounter/E1"},
            "valueQuantity": {"value": 120}
        })
    }

    #[tokio::test]
    async fn location_header_supplies_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .and(header("authorization", "Bearer T"))
            .and(header("content-type", "application/fhir+json"))
            .and(body_json(payload()))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "Observation/OBS1/_history/1")
                    .set_body_json(json!({"resourceType": "Observation", "status": "final"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = service(&server.uri())
            .create(Some("T"), payload().to_string().as_bytes())
            .await
            .expect("created");
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.id(), Some("OBS1"));
        assert_eq!(created.body["status"], "final");
    }

    #[tokio::test]
    async fn missing_location_falls_back_to_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Observation"))
            .and(query_param("encounter", "Encounter/E1"))
            .and(query_param("code", "http://loinc.org|8480-6"))
            .and(query_param("date", "2024-01-01T00:00:00Z"))
            .and(query_param("_sort", "-_lastUpdated"))
            .and(query_param("_count", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceType": "Bundle",
                "total": 1,
                "entry": [{"resource": {"resourceType": "Observation", "id": "OBS9"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = service(&server.uri())
            .create(Some("T"), payload().to_string().as_bytes())
            .await
            .expect("found by search");
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.id(), Some("OBS9"));
    }

    #[tokio::test]
    async fn empty_search_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Observation"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"resourceType": "Bundle", "total": 0})),
            )
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create(Some("T"), payload().to_string().as_bytes())
            .await
            .expect_err("no match");
        assert!(matches!(err, RelayError::NoMatchingObservation));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn operation_outcome_is_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "resourceType": "OperationOutcome",
                "issue": [
                    {"severity": "error", "code": "invalid", "diagnostics": "A"},
                    {"severity": "error", "code": "invalid", "diagnostics": "B"}
                ]
            })))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create(Some("T"), payload().to_string().as_bytes())
            .await
            .expect_err("rejected");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "FHIR server error: A, B");
    }

    #[tokio::test]
    async fn local_checks_run_before_any_upstream_call() {
        let server = MockServer::start().await;
        let svc = service(&server.uri());

        let err = svc
            .create(None, payload().to_string().as_bytes())
            .await
            .expect_err("no token");
        assert!(matches!(err, RelayError::MissingAccessToken));

        let mut incomplete = payload();
        incomplete["encounter"] = Value::Null;
        let err = svc
            .create(Some("T"), incomplete.to_string().as_bytes())
            .await
            .expect_err("missing field");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = svc.create(Some("T"), b"{not json").await.expect_err("bad json");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submits_rendered_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", "Observation/OBS2"))
            .expect(1)
            .mount(&server)
            .await;

        let draft = ObservationDraft {
            vital_sign: VitalSign::HeartRate,
            effective: Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(),
            encounter_id: "E1".into(),
            patient_id: "P1".into(),
            value: 72.0,
        };
        let created = service(&server.uri())
            .submit_at("T", &draft, Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
            .await
            .expect("created");
        assert_eq!(created.body, json!({"id": "OBS2"}));

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["subject"]["reference"], "Patient/P1");
        assert_eq!(sent["code"]["coding"][0]["code"], "8867-4");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_server() {
        let server = MockServer::start().await;
        let form = ObservationForm {
            code: "8480-6".into(),
            effective_date_time: "2023-02-30 10:00".into(),
            encounter: "E1".into(),
            value: "120".into(),
        };

        let err = service(&server.uri())
            .submit_form("T", &form, "P1")
            .await
            .expect_err("invalid date");
        assert!(matches!(err, RelayError::InvalidForm(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("2023-02-30"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn upstream_fields_win_over_injected_id() {
        let merged = with_id("OBS1".into(), br#"{"id":"server-id","status":"final"}"#);
        assert_eq!(merged, json!({"id": "server-id", "status": "final"}));
        assert_eq!(with_id("OBS1".into(), b"  "), json!({"id": "OBS1"}));
    }

    #[test]
    fn non_json_created_body_keeps_location_id() {
        assert_eq!(with_id("OBS1".into(), b"Created"), json!({"id": "OBS1"}));
        assert_eq!(with_id("OBS1".into(), b"[1, 2]"), json!({"id": "OBS1"}));
    }

    #[tokio::test]
    async fn plain_text_created_body_is_still_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "Observation/OBS1")
                    .set_body_string("Created"),
            )
            .mount(&server)
            .await;

        let created = service(&server.uri())
            .create(Some("T"), payload().to_string().as_bytes())
            .await
            .expect("created");
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body, json!({"id": "OBS1"}));
    }

    #[tokio::test]
    async fn unsearchable_payload_skips_fallback_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Observation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceType": "Bundle",
                "total": 1,
                "entry": [{"resource": {"resourceType": "Observation", "id": "SOMEONE_ELSES"}}]
            })))
            .expect(0)
            .mount(&server)
            .await;

        let mut body = payload();
        body["code"] = json!({"text": "Systolic BP"});
        let err = service(&server.uri())
            .create(Some("T"), body.to_string().as_bytes())
            .await
            .expect_err("no search without a code filter");
        assert!(matches!(err, RelayError::NoMatchingObservation));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
