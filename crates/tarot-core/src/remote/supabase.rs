//! Supabase PostgREST backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{AccessToken, RemoteError, RemoteResult, RemoteStore};
use crate::models::{DocumentPatch, FavoriteSet, NoteMap, SpreadRecord, UserDocument};
use crate::util::{compact_text, supabase_service_url};

const DOCUMENTS_TABLE: &str = "user_documents";

/// Which bearer token a PostgREST request carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bearer {
    /// The project's anon key, for requests made before sign-in
    Anon,
    /// The signed-in user's access token
    User,
    /// The user's token when signed in, the anon key otherwise
    UserOrAnon,
}

/// Thin PostgREST request helper shared by the table-backed clients.
#[derive(Clone)]
pub(crate) struct PostgrestClient {
    rest_url: String,
    anon_key: String,
    client: Client,
    token: AccessToken,
}

impl PostgrestClient {
    pub(crate) fn new(project_url: &str, anon_key: &str, token: AccessToken) -> RemoteResult<Self> {
        let rest_url = supabase_service_url(project_url, "/rest/v1")
            .map_err(|message| RemoteError::Unavailable(message.to_string()))?;
        let anon_key = anon_key.trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::Unavailable(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|error| RemoteError::Unavailable(error.to_string()))?;

        Ok(Self {
            rest_url,
            anon_key,
            client,
            token,
        })
    }

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        table: &str,
        bearer: Bearer,
    ) -> RemoteResult<RequestBuilder> {
        let token = match bearer {
            Bearer::Anon => self.anon_key.clone(),
            Bearer::User => self.token.require()?,
            Bearer::UserOrAnon => self.token.get().unwrap_or_else(|| self.anon_key.clone()),
        };
        Ok(self
            .client
            .request(method, self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
            .bearer_auth(token))
    }

    pub(crate) async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|error| RemoteError::Unavailable(error.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthenticated);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Unavailable(format!(
            "HTTP {}: {}",
            status.as_u16(),
            compact_text(&body)
        )))
    }

    pub(crate) async fn json<T: serde::de::DeserializeOwned>(response: Response) -> RemoteResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|error| RemoteError::Unavailable(format!("invalid response: {error}")))
    }
}

/// Per-user documents in the `user_documents` table.
///
/// Reads and writes are scoped to the signed-in user through the shared
/// [`AccessToken`]; row level security on the table does the rest.
#[derive(Clone)]
pub struct SupabaseDocumentStore {
    postgrest: PostgrestClient,
}

impl SupabaseDocumentStore {
    pub fn new(project_url: &str, anon_key: &str, token: AccessToken) -> RemoteResult<Self> {
        Ok(Self {
            postgrest: PostgrestClient::new(project_url, anon_key, token)?,
        })
    }
}

#[async_trait]
impl RemoteStore for SupabaseDocumentStore {
    async fn load_user_document(&self, uid: &str) -> RemoteResult<Option<UserDocument>> {
        let request = self
            .postgrest
            .request(Method::GET, DOCUMENTS_TABLE, Bearer::User)?
            .query(&[("user_id", format!("eq.{uid}")), ("select", "*".to_string())]);
        let response = PostgrestClient::send(request).await?;
        let rows: Vec<DocumentRow> = PostgrestClient::json(response).await?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    async fn save_user_document(&self, uid: &str, patch: &DocumentPatch) -> RemoteResult<()> {
        let payload = upsert_payload(uid, patch, Utc::now())?;
        let request = self
            .postgrest
            .request(Method::POST, DOCUMENTS_TABLE, Bearer::User)?
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&payload);
        PostgrestClient::send(request).await?;
        tracing::debug!("Saved remote document fields for {}", uid);
        Ok(())
    }

    async fn create_user_document(&self, uid: &str, document: &UserDocument) -> RemoteResult<()> {
        let payload = insert_payload(uid, document, Utc::now())?;
        let request = self
            .postgrest
            .request(Method::POST, DOCUMENTS_TABLE, Bearer::User)?
            .header("Prefer", "return=minimal")
            .json(&payload);
        PostgrestClient::send(request).await?;
        tracing::info!("Created remote document for {}", uid);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DocumentRow {
    #[serde(default)]
    favorites: Option<FavoriteSet>,
    #[serde(default)]
    notes: Option<NoteMap>,
    #[serde(default)]
    spreads: Option<Vec<SpreadRecord>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for UserDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            favorites: row.favorites.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            spreads: row.spreads.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn encode(value: &impl serde::Serialize) -> RemoteResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| RemoteError::Unavailable(format!("failed to encode payload: {error}")))
}

/// Row body carrying only the fields present in `patch`
fn upsert_payload(uid: &str, patch: &DocumentPatch, now: DateTime<Utc>) -> RemoteResult<Value> {
    let mut row = Map::new();
    row.insert("user_id".to_string(), json!(uid));
    if let Some(favorites) = &patch.favorites {
        row.insert("favorites".to_string(), encode(favorites)?);
    }
    if let Some(notes) = &patch.notes {
        row.insert("notes".to_string(), encode(notes)?);
    }
    if let Some(spreads) = &patch.spreads {
        row.insert("spreads".to_string(), encode(spreads)?);
    }
    row.insert("updated_at".to_string(), json!(now));
    Ok(Value::Object(row))
}

fn insert_payload(uid: &str, document: &UserDocument, now: DateTime<Utc>) -> RemoteResult<Value> {
    Ok(json!({
        "user_id": uid,
        "favorites": encode(&document.favorites)?,
        "notes": encode(&document.notes)?,
        "spreads": encode(&document.spreads)?,
        "created_at": document.created_at.unwrap_or(now),
        "updated_at": document.updated_at.unwrap_or(now),
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn client() -> PostgrestClient {
        PostgrestClient::new("https://demo.supabase.co/", "anon", AccessToken::new()).unwrap()
    }

    #[test]
    fn table_url_uses_rest_endpoint() {
        assert_eq!(
            client().table_url(DOCUMENTS_TABLE),
            "https://demo.supabase.co/rest/v1/user_documents"
        );
    }

    #[test]
    fn user_requests_need_an_access_token() {
        let client = client();
        assert!(matches!(
            client.request(Method::GET, DOCUMENTS_TABLE, Bearer::User),
            Err(RemoteError::Unauthenticated)
        ));
        assert!(client.request(Method::GET, "invite_codes", Bearer::Anon).is_ok());
    }

    #[test]
    fn blank_anon_key_is_rejected() {
        assert!(PostgrestClient::new("https://demo.supabase.co", " ", AccessToken::new()).is_err());
    }

    #[test]
    fn upsert_payload_carries_only_patched_fields() {
        let now = Utc::now();
        let payload =
            upsert_payload("u1", &DocumentPatch::favorites(FavoriteSet::from([4, 1])), now).unwrap();
        let object = payload.as_object().unwrap();

        assert_eq!(object["user_id"], "u1");
        assert_eq!(object["favorites"], json!([1, 4]));
        assert!(!object.contains_key("notes"));
        assert!(!object.contains_key("spreads"));
        assert!(object.contains_key("updated_at"));
    }

    #[test]
    fn insert_payload_writes_every_field() {
        let mut document = UserDocument::default();
        document.notes.insert(2, "priestess".to_string());
        let payload = insert_payload("u1", &document, Utc::now()).unwrap();

        assert_eq!(payload["notes"], json!({"2": "priestess"}));
        assert_eq!(payload["spreads"], json!([]));
        assert!(payload["created_at"].is_string());
    }

    #[test]
    fn row_with_null_columns_loads_as_empty_document() {
        let rows: Vec<DocumentRow> = serde_json::from_str(
            r#"[{"user_id":"u1","favorites":[3],"notes":null,"spreads":null}]"#,
        )
        .unwrap();
        let document: UserDocument = rows.into_iter().next().unwrap().into();
        assert_eq!(document.favorites, FavoriteSet::from([3]));
        assert!(document.notes.is_empty());
        assert!(document.spreads.is_empty());
    }
}
