// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! String-only writers.
//!
//! The verbose echo of the event stream and the HTML renderer both write text that is already
//! valid UTF-8, and both want [`std::io::Error`] rather than [`std::fmt::Error`] so that the
//! failure can be reported with its cause. [`WriteStr`] covers both, and [`HtmlEscaped`] wraps a
//! writer so that everything written through it is escaped for HTML text and attribute contexts.

use std::{
    fmt,
    io::{self, BufWriter, Write},
};

/// A writer that only accepts strings.
pub trait WriteStr {
    /// Writes a string.
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    /// Flushes any buffered contents.
    fn write_str_flush(&mut self) -> io::Result<()>;

    /// Writes a single character.
    fn write_char(&mut self, c: char) -> io::Result<()> {
        self.write_str(c.encode_utf8(&mut [0; 4]))
    }

    /// Writes formatted text, used by the `write!` and `writeln!` macros.
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        // fmt::Write discards the underlying error, so stash it on the side.
        struct Adapter<'a, T: ?Sized> {
            inner: &'a mut T,
            error: io::Result<()>,
        }

        impl<T: ?Sized + WriteStr> fmt::Write for Adapter<'_, T> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.inner.write_str(s).map_err(|err| {
                    self.error = Err(err);
                    fmt::Error
                })
            }
        }

        let mut adapter = Adapter {
            inner: self,
            error: Ok(()),
        };
        match fmt::write(&mut adapter, args) {
            Ok(()) => Ok(()),
            Err(_) if adapter.error.is_err() => adapter.error,
            Err(_) => Err(io::Error::other("formatter error")),
        }
    }
}

impl WriteStr for String {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_char(&mut self, c: char) -> io::Result<()> {
        self.push(c);
        Ok(())
    }
}

impl<W: Write> WriteStr for BufWriter<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_all(s.as_bytes())
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<T: WriteStr + ?Sized> WriteStr for &mut T {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        (**self).write_str_flush()
    }

    fn write_char(&mut self, c: char) -> io::Result<()> {
        (**self).write_char(c)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        (**self).write_fmt(args)
    }
}

/// Wraps a [`WriteStr`] and escapes `&`, `<`, `>`, `"` and `'` in everything written through it.
#[derive(Debug)]
pub struct HtmlEscaped<W> {
    inner: W,
}

impl<W: WriteStr> HtmlEscaped<W> {
    /// Creates a new escaping writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: WriteStr> WriteStr for HtmlEscaped<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let mut last = 0;
        for (idx, c) in s.char_indices() {
            let replacement = match c {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' => "&quot;",
                '\'' => "&#39;",
                _ => continue,
            };
            self.inner.write_str(&s[last..idx])?;
            self.inner.write_str(replacement)?;
            last = idx + c.len_utf8();
        }
        self.inner.write_str(&s[last..])
    }

    fn write_str_flush(&mut self) -> io::Result<()> {
        self.inner.write_str_flush()
    }
}
