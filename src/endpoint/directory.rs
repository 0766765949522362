use std::sync::Arc;

use dashmap::DashMap;
use listpoint_error::{EndpointError, ListpointResult};
use tracing::debug;

use super::Endpoint;
use crate::config::EndpointSettings;

/// Каталог endpoint'ов: один экземпляр на идентификатор.
///
/// Играет роль хостового слоя, который соблюдает [`Endpoint::is_singleton`]:
/// повторный `resolve` с тем же идентификатором возвращает тот же `Arc`.
/// Идентификатор сравнивается после обрезки пробелов по краям.
#[derive(Debug)]
pub struct EndpointDirectory {
    endpoints: DashMap<Arc<str>, Arc<Endpoint>>,
    settings: EndpointSettings,
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::with_settings(EndpointSettings::default())
    }

    /// Каталог, создающий новые endpoint'ы с указанными настройками.
    pub fn with_settings(settings: EndpointSettings) -> Self {
        Self {
            endpoints: DashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EndpointSettings {
        &self.settings
    }

    /// Возвращает endpoint для идентификатора, создавая его при первом
    /// обращении. Новый endpoint запускается сразу, если включён
    /// `auto_start`.
    ///
    /// # Ошибки
    /// [`EndpointError::InvalidIdentity`] для пустого идентификатора.
    pub fn resolve(
        &self,
        identity: &str,
    ) -> ListpointResult<Arc<Endpoint>> {
        let key = normalize(identity)?;
        let entry = self.endpoints.entry(Arc::clone(&key)).or_insert_with(|| {
            let endpoint = Endpoint::with_settings(Arc::clone(&key), &self.settings);
            if self.settings.auto_start {
                endpoint.start();
            }
            debug!(endpoint = %key, auto_start = self.settings.auto_start, "Endpoint created");
            Arc::new(endpoint)
        });
        Ok(Arc::clone(entry.value()))
    }

    /// Возвращает endpoint, если он уже создан.
    pub fn get(
        &self,
        identity: &str,
    ) -> Option<Arc<Endpoint>> {
        self.endpoints
            .get(identity.trim())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Удаляет endpoint из каталога, предварительно остановив его.
    ///
    /// Держатели `Arc` продолжают владеть остановленным экземпляром;
    /// следующий `resolve` создаст новый.
    pub fn remove(
        &self,
        identity: &str,
    ) -> Option<Arc<Endpoint>> {
        let (_, endpoint) = self.endpoints.remove(identity.trim())?;
        endpoint.stop();
        debug!(endpoint = %endpoint.identity(), "Endpoint removed");
        Some(endpoint)
    }

    /// Идентификаторы зарегистрированных endpoint'ов, отсортированные.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .endpoints
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Останавливает все endpoint'ы, не удаляя их. Возвращает суммарное
    /// количество удалённых из журналов сообщений.
    pub fn stop_all(&self) -> usize {
        let endpoints: Vec<Arc<Endpoint>> = self
            .endpoints
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        endpoints.iter().map(|endpoint| endpoint.stop()).sum()
    }
}

impl Default for EndpointDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(identity: &str) -> ListpointResult<Arc<str>> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        return Err(EndpointError::InvalidIdentity {
            identity: identity.to_string(),
        }
        .into());
    }
    Ok(Arc::from(trimmed))
}

#[cfg(test)]
mod tests {
    use listpoint_error::StatusCode;
    use rstest::rstest;

    use super::*;
    use crate::endpoint::{Message, StrategyKind};

    /// Тест проверяет политику singleton: один идентификатор, один
    /// экземпляр.
    #[test]
    fn test_resolve_returns_same_instance() {
        let directory = EndpointDirectory::new();
        let a = directory.resolve("orders").unwrap();
        let b = directory.resolve("  orders ").unwrap();
        let other = directory.resolve("audit").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.identities(), vec!["audit", "orders"]);
        assert!(a.is_active());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn test_resolve_rejects_empty_identity(#[case] identity: &str) {
        let directory = EndpointDirectory::new();
        let err = directory.resolve(identity).unwrap_err();

        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_resolve_without_auto_start() {
        let directory = EndpointDirectory::with_settings(EndpointSettings {
            auto_start: false,
            strategy: StrategyKind::RoundRobin,
            ..EndpointSettings::default()
        });
        let endpoint = directory.resolve("tap").unwrap();

        assert!(!endpoint.is_active());
        assert_eq!(endpoint.strategy_name(), "round_robin");
    }

    /// Тест проверяет, что remove останавливает endpoint, а следующий
    /// resolve создаёт новый экземпляр.
    #[test]
    fn test_remove_stops_and_forgets() {
        let directory = EndpointDirectory::new();
        let first = directory.resolve("tap").unwrap();
        first.on_message(Message::new("x")).unwrap();

        let removed = directory.remove("tap").unwrap();
        assert!(Arc::ptr_eq(&first, &removed));
        assert!(!first.is_active());
        assert!(directory.get("tap").is_none());
        assert!(directory.remove("tap").is_none());

        let second = directory.resolve("tap").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_stop_all() {
        let directory = EndpointDirectory::new();
        for id in ["a", "b"] {
            directory
                .resolve(id)
                .unwrap()
                .on_message(Message::new("x"))
                .unwrap();
        }

        assert_eq!(directory.stop_all(), 2);
        assert_eq!(directory.len(), 2);
        assert!(directory.get("a").is_some_and(|e| !e.is_active()));
    }
}
