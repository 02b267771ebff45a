use std::fmt::{self, Display, Formatter, Write as _};

use base::object::Relocation;

use super::program::{Program, Statement, Word};

fn relocation_tag(word: &Word) -> &'static str {
    match word.relocation {
        Some(Relocation::PageOffset) => "M0",
        Some(Relocation::FullWord) => "M1",
        None => "",
    }
}

struct ListingLine<'a>(&'a Statement);

impl Display for ListingLine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let statement = self.0;
        let mut words = statement.words.iter();
        match words.next() {
            Some(first) => write!(
                f,
                "({:04X}) {:04X} {:2}",
                first.address,
                first.value,
                relocation_tag(first)
            )?,
            None => write!(f, "({:04X})        ", statement.address)?,
        }
        write!(f, " ({:>4}) {}", statement.line, statement.source.trim_end())?;
        for w in words {
            write!(
                f,
                "\n({:04X}) {:04X} {:2}",
                w.address,
                w.value,
                relocation_tag(w)
            )?;
        }
        Ok(())
    }
}

/// Render the listing of `program`: each statement with the words it
/// assembled to, then the literal pool, then the symbol table.
pub(crate) fn render_listing(program: &Program) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail, so the results are ignored.
    for statement in program.statements() {
        let _ = writeln!(out, "{}", ListingLine(statement));
    }
    if !program.literals().is_empty() {
        let _ = writeln!(out, "\nLiterals:");
        for (address, value) in program.literals().iter() {
            let _ = writeln!(out, "({address:04X}) {value:04X}");
        }
    }
    let _ = writeln!(out, "\nSymbols:");
    for sym in program.symbols().iter() {
        let _ = writeln!(out, "{sym}");
    }
    out
}
