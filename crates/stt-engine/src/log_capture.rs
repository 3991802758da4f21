use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

/// Collects `WARN` events as `message field=value ...` lines.
struct WarnLayer {
    lines: Arc<Mutex<Vec<String>>>,
}

struct LineVisitor {
    line: String,
}

impl Visit for LineVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.line.insert_str(0, &format!("{value:?}"));
        } else {
            self.line.push_str(&format!(" {}={value:?}", field.name()));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = LineVisitor {
            line: String::new(),
        };
        event.record(&mut visitor);
        self.lines.lock().unwrap().push(visitor.line);
    }
}

/// Run `f` with a scoped subscriber and return the warnings it logged.
pub(crate) fn warnings(f: impl FnOnce()) -> Vec<String> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(WarnLayer {
        lines: Arc::clone(&lines),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = lines.lock().unwrap().clone();
    captured
}
