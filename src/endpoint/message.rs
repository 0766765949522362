use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Сообщение, проходящее через endpoint.
///
/// Endpoint не интерпретирует ни payload, ни заголовки: он только хранит и
/// пересылает клоны. Клон не копирует данные: `Bytes` разделяет буфер
/// payload, а заголовки лежат за общим `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: Uuid,
    payload: Bytes,
    headers: Arc<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Создаёт сообщение с новым идентификатором и текущим временем.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
            headers: Arc::default(),
            created_at: Utc::now(),
        }
    }

    /// Добавляет заголовок (builder). Заголовки, разделённые с клонами,
    /// копируются перед изменением.
    pub fn with_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.headers).insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn header(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Размер payload в байтах.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
