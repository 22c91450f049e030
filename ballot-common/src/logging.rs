//! Logging helpers shared by the ballot crates.

use slog::Logger;

/// Extension trait for [Logger].
pub trait LoggerExtensions {
    /// Derive a child logger tagged with the short type name of `T` under the `src` key.
    fn new_with_component_name<T>(&self) -> Self;
}

impl LoggerExtensions for Logger {
    fn new_with_component_name<T>(&self) -> Self {
        self.new(slog::o!("src" => short_type_name::<T>()))
    }
}

/// `ballot_client::submission::VoteSubmitter` becomes `VoteSubmitter`, generics are dropped.
fn short_type_name<T>() -> &'static str {
    let full_name = std::any::type_name::<T>();
    let base = match full_name.find('<') {
        Some(generics_start) => &full_name[..generics_start],
        None => full_name,
    };

    base.rsplit("::").next().unwrap_or(base)
}
