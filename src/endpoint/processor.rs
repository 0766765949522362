use listpoint_error::ListpointResult;

use super::Message;

/// Обработчик сообщений потребителя.
///
/// Вызывается синхронно в потоке, выполняющем `send`, один раз на каждое
/// разосланное сообщение, пока потребитель зарегистрирован. Ошибка
/// обработчика возвращается отправителю (fail-fast), endpoint её не глотает.
///
/// Для замыканий вида `Fn(&Message) -> ListpointResult<()>` реализация
/// предоставляется автоматически.
pub trait Processor: Send + Sync + 'static {
    /// Обрабатывает одно сообщение.
    fn process(
        &self,
        message: &Message,
    ) -> ListpointResult<()>;

    /// Имя обработчика для логов и ошибок.
    ///
    /// По умолчанию `type_name::<Self>()`, для замыканий это длинная строка,
    /// поэтому собственные типы лучше переопределяют метод.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Processor for F
where
    F: Fn(&Message) -> ListpointResult<()> + Send + Sync + 'static,
{
    fn process(
        &self,
        message: &Message,
    ) -> ListpointResult<()> {
        self(message)
    }
}
