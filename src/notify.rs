// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

/// Short user-facing status messages about completed operations.
pub(crate) trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

pub(crate) struct Console;

impl Notifier for Console {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("Error: {message}");
    }
}

pub(crate) struct Silent;

impl Notifier for Silent {
    fn success(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
