use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        OnceLock,
    },
};

use parking_lot::Mutex;

use super::Message;

/// Первый сегмент вмещает `1 << FIRST_SEGMENT_SHIFT` сообщений, каждый
/// следующий вдвое больше предыдущего.
const FIRST_SEGMENT_SHIFT: u32 = 5;
const SEGMENTS: usize = (usize::BITS - FIRST_SEGMENT_SHIFT) as usize;

type Segment = Box<[OnceLock<Message>]>;

/// Журнал сообщений endpoint'а.
///
/// Append-only последовательность в порядке поступления, без дедупликации и
/// без ограничения размера. Хранится в сегментах растущего размера, которые
/// после выделения никогда не перемещаются.
///
/// Писатели упорядочены коротким мьютексом: `append` записывает один слот и
/// публикует новую длину (амортизированно O(1)). Читатели этот мьютекс не
/// берут. `snapshot` один раз читает опубликованную длину и копирует префикс
/// такой длины, так что долгое копирование большого журнала не задерживает
/// ни одного `append`. Снимок отражает все `append`, завершившиеся до вызова,
/// и никогда не содержит частично записанных элементов.
pub struct MessageLog {
    segments: Box<[OnceLock<Segment>]>,
    published: AtomicUsize,
    writer: Mutex<()>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            segments: (0..SEGMENTS).map(|_| OnceLock::new()).collect(),
            published: AtomicUsize::new(0),
            writer: Mutex::new(()),
        }
    }

    /// Создаёт журнал с заранее выделенными сегментами на `capacity`
    /// сообщений.
    pub fn with_capacity(capacity: usize) -> Self {
        let log = Self::new();
        if let Some(last) = capacity.checked_sub(1) {
            let (last_segment, _) = locate(last);
            for (segment, slot) in log.segments.iter().enumerate().take(last_segment + 1) {
                slot.get_or_init(|| new_segment(segment));
            }
        }
        log
    }

    /// Добавляет сообщение в конец журнала.
    pub fn append(
        &self,
        message: Message,
    ) {
        let _writer = self.writer.lock();
        let index = self.published.load(Ordering::Relaxed);
        let (segment, offset) = locate(index);
        let slots = self.segments[segment].get_or_init(|| new_segment(segment));
        // Слот с индексом `published` под мьютексом писателя всегда пуст.
        let _ = slots[offset].set(message);
        self.published.store(index + 1, Ordering::Release);
    }

    /// Возвращает снимок текущего содержимого в порядке добавления.
    pub fn snapshot(&self) -> Vec<Message> {
        let mut remaining = self.published.load(Ordering::Acquire);
        let mut out = Vec::with_capacity(remaining);
        for segment in self.segments.iter() {
            if remaining == 0 {
                break;
            }
            let Some(slots) = segment.get() else {
                break;
            };
            let take = remaining.min(slots.len());
            out.extend(slots[..take].iter().filter_map(OnceLock::get).cloned());
            remaining -= take;
        }
        out
    }

    /// Очищает журнал, освобождая сегменты, и возвращает количество
    /// удалённых сообщений.
    pub fn clear(&mut self) -> usize {
        let discarded = std::mem::take(self.published.get_mut());
        for segment in self.segments.iter_mut() {
            segment.take();
        }
        discarded
    }

    pub fn len(&self) -> usize {
        self.published.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageLog {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MessageLog")
            .field("len", &self.len())
            .finish()
    }
}

/// Номер сегмента и смещение в нём для сообщения с индексом `index`.
fn locate(index: usize) -> (usize, usize) {
    let pos = index + (1 << FIRST_SEGMENT_SHIFT);
    let bits = pos.ilog2();
    ((bits - FIRST_SEGMENT_SHIFT) as usize, pos - (1 << bits))
}

fn new_segment(segment: usize) -> Segment {
    let len = 1usize << (segment + FIRST_SEGMENT_SHIFT as usize);
    (0..len).map(|_| OnceLock::new()).collect()
}
