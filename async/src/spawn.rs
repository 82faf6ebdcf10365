/// Spawns a task with optional tracing instrumentation.
///
/// With the `instrument` feature enabled, the task runs inside a detached
/// `trace_span` that follows from the spawning span.
///
/// # Syntax
///
/// ```text
/// // Simple case (no fields):
/// spawn!(tracker, "task_name", async { ... })
///
/// // Complex case (with span fields - use parentheses):
/// spawn!(tracker, "task_name", (?field1, field2 = value), async { ... })
/// ```
macro_rules! spawn {
    // Simple case: just task name and future (no fields)
    ($pool:expr, $name:literal, async $($rest:tt)*) => {{
        #[cfg(feature = "instrument")]
        {
            let task = async $($rest)*;
            let span = tracing::trace_span!(parent: None, $name);
            span.follows_from(tracing::Span::current());
            $pool.spawn(tracing::Instrument::instrument(task, span))
        }
        #[cfg(not(feature = "instrument"))]
        {
            $pool.spawn(async $($rest)*)
        }
    }};

    // Complex case: has fields before async
    ($pool:expr, $name:literal, ($($field:tt)*), async $($rest:tt)*) => {{
        #[cfg(feature = "instrument")]
        {
            let task = async $($rest)*;
            let span = tracing::trace_span!(parent: None, $name, $($field)*);
            span.follows_from(tracing::Span::current());
            $pool.spawn(tracing::Instrument::instrument(task, span))
        }
        #[cfg(not(feature = "instrument"))]
        {
            $pool.spawn(async $($rest)*)
        }
    }};
}

pub(crate) use spawn;
