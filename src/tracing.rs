use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::{stdout, Write};
use std::num::NonZeroU64;
use std::ops::RangeInclusive;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use thread_local::ThreadLocal;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber, span};
use tracing::span::Id;
use tracing_core::Interest;

struct SpanState {
    parent: Option<Id>,
    /// number of existing handles to the span; the span is forgotten once this reaches zero
    reference_counter: AtomicUsize,
    /// span name together with its recorded fields
    description: String,
    metadata: &'static Metadata<'static>,
    /// microseconds since the creation of the subscriber when the span was entered, or 0
    entered_timestamp: AtomicU64,
    /// nesting depth of the span
    depth: usize
}

///
/// A [`Subscriber`] that prints entered spans and events as an indented tree, together
/// with the time spent in each span. Spans and events nested deeper than `max_depth`
/// are not printed.
///
/// All algorithms of this crate open `trace`-level spans, so with
/// `Level::INFO..=Level::TRACE`, calling e.g. [`crate::table::Table::sort_by_column()`] prints
/// something like
/// ```text
/// sort_by_column(column=0)
///   sort_index
///   done(12us)
///   apply_permutation(inverse=false)
///   done(40us)
/// done(61us)
/// ```
///
pub struct LogAlgorithmSubscriber {
    span_ids: AtomicU64,
    span_map: RwLock<HashMap<Id, SpanState>>,
    current_span: ThreadLocal<Cell<Option<NonZeroU64>>>,
    default_instant: Instant,
    interested_level: RangeInclusive<Level>,
    max_depth: usize,
    output: Mutex<Box<dyn Write + Send>>
}

impl LogAlgorithmSubscriber {

    pub fn new<W>(levels: RangeInclusive<Level>, max_depth: usize, output: W) -> Self
        where W: Write + Send + 'static
    {
        Self {
            span_ids: AtomicU64::new(1),
            span_map: RwLock::new(HashMap::new()),
            current_span: ThreadLocal::new(),
            default_instant: Instant::now(),
            interested_level: levels,
            max_depth: max_depth,
            output: Mutex::new(Box::new(output))
        }
    }

    ///
    /// Installs a [`LogAlgorithmSubscriber`] writing to stdout as global default subscriber.
    ///
    /// # Panics
    ///
    /// If a global default subscriber has already been set.
    ///
    pub fn init(levels: RangeInclusive<Level>, max_depth: usize) {
        tracing::subscriber::set_global_default(Self::new(levels, max_depth, stdout())).unwrap()
    }

    ///
    /// Like [`LogAlgorithmSubscriber::init()`], but ignores whether a global subscriber has
    /// already been set. Meant to be called at the start of tests.
    ///
    pub fn init_test() {
        _ = tracing::subscriber::set_global_default(Self::new(Level::INFO..=Level::INFO, 2, stdout()))
    }

    fn span_map<'a>(&'a self) -> RwLockReadGuard<'a, HashMap<Id, SpanState>> {
        self.span_map.read().unwrap()
    }

    fn span_map_mut<'a>(&'a self) -> RwLockWriteGuard<'a, HashMap<Id, SpanState>> {
        self.span_map.write().unwrap()
    }

    fn current_depth(&self) -> usize {
        self.current_span.get_or(|| Cell::new(None)).get()
            .and_then(|id| self.span_map().get(&Id::from_non_zero_u64(id)).map(|state| state.depth + 1))
            .unwrap_or(0)
    }

    fn print_line(&self, depth: usize, line: &str) {
        let mut output = self.output.lock().unwrap();
        _ = writeln!(output, "{:indent$}{}", "", line, indent = 2 * depth);
        _ = output.flush();
    }

    fn now_micros(&self) -> u64 {
        // never zero, since zero marks a span that is not entered
        Instant::now().duration_since(self.default_instant).as_micros() as u64 + 1
    }
}

struct FieldRecorder {
    message: Option<String>,
    fields: Option<String>
}

impl FieldRecorder {

    fn new() -> Self {
        Self { message: None, fields: None }
    }

    fn into_string(self) -> String {
        match (self.message, self.fields) {
            (Some(mut message), Some(fields)) => {
                _ = write!(&mut message, "({})", fields);
                message
            },
            (Some(message), None) => message,
            (None, Some(fields)) => format!("({})", fields),
            (None, None) => String::new()
        }
    }
}

impl Visit for FieldRecorder {

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else if let Some(fields) = &mut self.fields {
            _ = write!(fields, ", {}={:?}", field.name(), value);
        } else {
            self.fields = Some(format!("{}={:?}", field.name(), value));
        }
    }
}

impl Subscriber for LogAlgorithmSubscriber {

    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if self.interested_level.contains(metadata.level()) {
            Interest::always()
        } else {
            Interest::never()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.interested_level.contains(metadata.level())
    }

    fn current_span(&self) -> tracing_core::span::Current {
        if let Some(span) = self.current_span.get_or(|| Cell::new(None)).get() {
            let id = Id::from_non_zero_u64(span);
            match self.span_map().get(&id) {
                Some(state) => tracing_core::span::Current::new(id, state.metadata),
                None => tracing_core::span::Current::none()
            }
        } else {
            tracing_core::span::Current::none()
        }
    }

    fn new_span(&self, span: &span::Attributes<'_>) -> Id {
        let id = NonZeroU64::new(self.span_ids.fetch_add(1, Ordering::Relaxed)).unwrap();
        let parent = span.parent().cloned().or_else(|| self.current_span.get_or(|| Cell::new(None)).get().map(Id::from_non_zero_u64));
        let mut spans = self.span_map_mut();
        let depth = parent.as_ref().and_then(|id| spans.get(id)).map(|state| state.depth + 1).unwrap_or(0);

        let mut description = FieldRecorder::new();
        span.record(&mut description);
        description.message = Some(span.metadata().name().to_owned());

        assert!(spans.insert(Id::from_non_zero_u64(id), SpanState {
            parent: parent,
            depth: depth,
            metadata: span.metadata(),
            reference_counter: AtomicUsize::new(1),
            description: description.into_string(),
            entered_timestamp: AtomicU64::new(0)
        }).is_none());
        return Id::from_non_zero_u64(id);
    }

    fn record(&self, _span: &Id, _values: &span::Record<'_>) {
        // fields recorded after creation are not shown
    }

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let depth = self.current_depth();
        if depth <= self.max_depth {
            let mut description = FieldRecorder::new();
            event.record(&mut description);
            self.print_line(depth, &description.into_string());
        }
    }

    fn enter(&self, span: &Id) {
        self.current_span.get_or(|| Cell::new(None)).set(Some(span.into_non_zero_u64()));
        let span_map = self.span_map();
        let entered_span = span_map.get(span).unwrap();
        if entered_span.depth <= self.max_depth {
            self.print_line(entered_span.depth, &entered_span.description);
        }
        assert!(entered_span.entered_timestamp.compare_exchange(0, self.now_micros(), Ordering::SeqCst, Ordering::SeqCst).is_ok(), "entered an already running span");
    }

    fn exit(&self, span: &Id) {
        let span_map = self.span_map();
        let exited_span = span_map.get(span).unwrap();
        let entered_timestamp = exited_span.entered_timestamp.swap(0, Ordering::SeqCst);
        if exited_span.depth <= self.max_depth {
            self.print_line(exited_span.depth, &format!("done({}us)", self.now_micros() - entered_timestamp));
        }
        self.current_span.get_or(|| Cell::new(None)).set(exited_span.parent.as_ref().map(|id| id.into_non_zero_u64()));
    }

    fn clone_span(&self, id: &Id) -> Id {
        _ = self.span_map().get(id).unwrap().reference_counter.fetch_add(1, Ordering::Relaxed);
        return id.clone();
    }

    fn try_close(&self, id: Id) -> bool {
        let remaining_handles = self.span_map().get(&id).unwrap().reference_counter.fetch_sub(1, Ordering::Relaxed) - 1;
        if remaining_handles == 0 {
            _ = self.span_map_mut().remove(&id).unwrap();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Write for SharedBuffer {

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_log_spans_and_events() {
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    let subscriber = LogAlgorithmSubscriber::new(Level::INFO..=Level::TRACE, 3, buffer.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut values = vec![1, 2, 3, 4, 5, 6];
        let mut dsize = [2, 3];
        crate::transpose::transpose_2d(&mut values, &mut dsize);
    });
    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let lines = output.lines().collect::<Vec<_>>();
    assert_eq!("transpose_2d_using_allocator", lines[0]);
    assert!(lines[1].starts_with("  transpose(rows=2, cols=3, strategy=Rectangular)"));
    assert!(lines.last().unwrap().starts_with("done("));
}

#[test]
fn test_log_max_depth() {
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    let subscriber = LogAlgorithmSubscriber::new(Level::INFO..=Level::TRACE, 0, buffer.clone());
    tracing::subscriber::with_default(subscriber, || {
        let outer = tracing::info_span!("outer", len = 4);
        let _guard = outer.enter();
        tracing::info!("hidden");
    });
    let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let lines = output.lines().collect::<Vec<_>>();
    assert_eq!(2, lines.len());
    assert_eq!("outer(len=4)", lines[0]);
    assert!(lines[1].starts_with("done("));
}
