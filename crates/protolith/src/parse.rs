use std::{iter::Peekable, rc::Rc};

use crate::{
    error::{Error, ErrorKind, RunResult},
    expressions::Expr,
    vm::Vm,
};

/// Result of one top-level read.
pub enum ReadOutcome {
    /// A complete expression tree.
    Expression(Rc<Expr>),
    /// The line held nothing but its newline.
    BlankLine,
    /// The character source is exhausted.
    EndOfInput,
}

/// S-expression reader over any character source.
///
/// The reader is line-prompt agnostic: the REPL feeds it a prompting source,
/// tests feed it `str::chars`. Atoms and string literals are interned into
/// the interpreter as they are read, so expression nodes carry heap ids.
///
/// Grammar notes:
/// - whitespace (newlines included) separates tokens inside a form; a bare
///   newline at top level reads as [`ReadOutcome::BlankLine`];
/// - `"…"` literals fold any inner whitespace to a single space and accept
///   only the escapes `\t`, `\n`, `\\`;
/// - a token starting with a decimal digit must parse as a number in full;
/// - `()` is a legal zero-element list.
pub struct Reader<I: Iterator<Item = char>> {
    chars: Peekable<I>,
}

impl<I: Iterator<Item = char>> Reader<I> {
    pub fn new(source: I) -> Self {
        Self {
            chars: source.peekable(),
        }
    }

    /// Reads one top-level expression, a blank line, or end of input.
    pub fn read(&mut self, vm: &mut Vm) -> RunResult<ReadOutcome> {
        loop {
            match self.chars.next() {
                None => return Ok(ReadOutcome::EndOfInput),
                Some('\n') => return Ok(ReadOutcome::BlankLine),
                Some(c) if c.is_whitespace() => {}
                Some(c) => return Ok(ReadOutcome::Expression(self.read_expr(c, vm)?)),
            }
        }
    }

    /// Enforces the top-level trailing rule: after a complete form, the next
    /// character must be a newline or end of input.
    pub fn finish_line(&mut self) -> RunResult<()> {
        match self.chars.next() {
            None | Some('\n') => Ok(()),
            Some(_) => Err(Error::new(ErrorKind::UnexpectedCharacter)),
        }
    }

    fn read_expr(&mut self, first: char, vm: &mut Vm) -> RunResult<Rc<Expr>> {
        match first {
            '"' => self.read_string(vm),
            '(' => self.read_list(vm),
            c => self.read_token(c, vm),
        }
    }

    fn read_list(&mut self, vm: &mut Vm) -> RunResult<Rc<Expr>> {
        let mut items = Vec::new();
        loop {
            match self.chars.next() {
                None => return Err(Error::new(ErrorKind::UnexpectedEof)),
                Some(')') => break,
                Some(c) if c.is_whitespace() => {}
                Some(c) => items.push(self.read_expr(c, vm)?),
            }
        }
        Ok(Rc::new(Expr::List(items)))
    }

    fn read_string(&mut self, vm: &mut Vm) -> RunResult<Rc<Expr>> {
        let mut content = String::new();
        loop {
            match self.chars.next() {
                None => return Err(Error::new(ErrorKind::UnexpectedEof)),
                Some('"') => break,
                Some('\n') => return Err(Error::new(ErrorKind::UnexpectedNewline)),
                Some('\\') => match self.chars.next() {
                    None => return Err(Error::new(ErrorKind::UnexpectedEof)),
                    Some('t') => content.push('\t'),
                    Some('n') => content.push('\n'),
                    Some('\\') => content.push('\\'),
                    Some(_) => return Err(Error::new(ErrorKind::InvalidEscape)),
                },
                // any whitespace inside a string folds to one space
                Some(c) if c.is_whitespace() => content.push(' '),
                Some(c) => content.push(c),
            }
        }
        let id = vm.intern(&content);
        Ok(Rc::new(Expr::Str(id)))
    }

    fn read_token(&mut self, first: char, vm: &mut Vm) -> RunResult<Rc<Expr>> {
        let mut token = String::new();
        let mut current = first;
        loop {
            if !current.is_ascii_graphic() {
                let kind = if token.starts_with(|c: char| c.is_ascii_digit()) {
                    ErrorKind::InvalidNumber
                } else {
                    ErrorKind::InvalidAtom
                };
                return Err(Error::new(kind));
            }
            token.push(current);
            match self.chars.peek() {
                None => break,
                Some(&next) if next == '(' || next == ')' || next.is_whitespace() => break,
                Some(&next) => {
                    self.chars.next();
                    current = next;
                }
            }
        }

        if token.starts_with(|c: char| c.is_ascii_digit()) {
            let number: f64 = token.parse().map_err(|_| Error::new(ErrorKind::InvalidNumber))?;
            Ok(Rc::new(Expr::Number(number)))
        } else {
            let id = vm.intern(&token);
            Ok(Rc::new(Expr::Atom(id)))
        }
    }
}
