use std::fmt;
use std::fmt::Display;

/// Indentation-aware writer over a formatter. Indentation is two spaces per level and is only
/// emitted by [`State::new_line`].
pub(crate) struct State<'fmt, 'fmt2> {
    indent_level: usize,
    output: &'fmt mut fmt::Formatter<'fmt2>,
}

impl<'a, 'b> State<'a, 'b> {
    pub(crate) fn new(output: &'a mut fmt::Formatter<'b>) -> State<'a, 'b> {
        Self {
            indent_level: 0,
            output,
        }
    }

    pub(crate) fn write<T: Display>(&mut self, value: T) -> fmt::Result {
        write!(self.output, "{value}")
    }

    pub(crate) fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.output.write_fmt(args)
    }

    pub(crate) fn new_line(&mut self) -> fmt::Result {
        self.write("\n")?;
        for _ in 0..self.indent_level {
            self.write("  ")?
        }
        Ok(())
    }

    /// Ends the current line and leaves one empty line before the next one.
    pub(crate) fn blank_line(&mut self) -> fmt::Result {
        self.write("\n")?;
        self.new_line()
    }

    pub(crate) fn indent_no_new_line(&mut self) {
        self.indent_level += 1;
    }

    pub(crate) fn dedent_no_new_line(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub(crate) fn dedent(&mut self) -> fmt::Result {
        self.dedent_no_new_line();
        self.new_line()
    }

    /// Writes `{`, one indented line per value, then `}` on its own line.
    pub(crate) fn block<T>(
        &mut self,
        values: &[T],
        write_line: impl FnMut(&mut State<'_, '_>, &T) -> fmt::Result,
    ) -> fmt::Result {
        self.write("{")?;
        write_indented_lines(self, values, write_line)?;
        self.write("}")
    }

    /// Writes the values on the current line, separated by `separator`.
    pub(crate) fn write_separated<T: Display>(
        &mut self,
        values: impl IntoIterator<Item = T>,
        separator: &str,
    ) -> fmt::Result {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.write(separator)?;
            }
            self.write(value)?;
        }
        Ok(())
    }
}

pub(crate) fn write_indented_lines<T>(
    state: &mut State<'_, '_>,
    values: &[T],
    mut write_line: impl FnMut(&mut State<'_, '_>, &T) -> fmt::Result,
) -> fmt::Result {
    if !values.is_empty() {
        state.indent_no_new_line();
        for value in values {
            state.new_line()?;
            write_line(state, value)?;
        }
        state.dedent()?;
    }
    Ok(())
}
