use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::types::IType;
use crate::return_type_error;
use std::collections::BTreeMap;

/// Parses a canonical type string, e.g. `list<nullable<number>>`, `struct<a:number,b:*>`
/// or `enum<"Two words">`.
pub fn parse_type(text: &str) -> Result<IType, CompilerError> {
    let mut parser = TypeParser {
        source: text,
        chars: text.char_indices().peekable(),
    };

    let parsed = parser.parse_type()?;
    parser.skip_whitespace();

    if let Some((index, _)) = parser.chars.peek() {
        let trailing = &text[*index..];
        return_type_error!(
            format!("Unexpected trailing characters '{}' in type '{}'", trailing, text),
            { FoundType => text }
        );
    }

    Ok(parsed)
}

struct TypeParser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl TypeParser<'_> {
    fn parse_type(&mut self) -> Result<IType, CompilerError> {
        self.skip_whitespace();

        if self.eat('*') {
            return Ok(IType::Wildcard);
        }

        let word = self.identifier()?;
        let parsed = match word.as_str() {
            "number" => IType::Number,
            "string" => IType::String,
            "boolean" => IType::Boolean,
            "timestamp" => IType::Timestamp,
            "null" => IType::Null,

            "nullable" => IType::nullable(self.single_parameter()?),
            "list" => IType::list(self.single_parameter()?),
            "event" => IType::event(self.single_parameter()?),
            "interval" => IType::interval(self.single_parameter()?),
            "timeline" => IType::timeline(self.single_parameter()?),

            "enum" => IType::Enum(self.name_parameter()?),
            "hierarchy" => IType::Hierarchy(self.name_parameter()?),

            "union" => {
                self.expect('<')?;
                let mut members = Vec::new();
                if !self.eat('>') {
                    members.push(self.parse_type()?);
                    while self.eat(',') {
                        members.push(self.parse_type()?);
                    }
                    self.expect('>')?;
                }
                IType::Union(members)
            }

            "struct" => {
                self.expect('<')?;
                let mut fields = BTreeMap::new();
                if !self.eat('>') {
                    loop {
                        let field_name = self.name()?;
                        self.expect(':')?;
                        let field_type = self.parse_type()?;
                        fields.insert(field_name, field_type);

                        if !self.eat(',') {
                            break;
                        }
                    }
                    self.expect('>')?;
                }
                IType::Struct(fields)
            }

            unknown => {
                return_type_error!(
                    format!("Unknown type constructor '{}' in '{}'", unknown, self.source),
                    { FoundType => self.source }
                );
            }
        };

        Ok(parsed)
    }

    fn single_parameter(&mut self) -> Result<IType, CompilerError> {
        self.expect('<')?;
        let inner = self.parse_type()?;
        self.expect('>')?;
        Ok(inner)
    }

    fn name_parameter(&mut self) -> Result<String, CompilerError> {
        self.expect('<')?;
        let name = self.name()?;
        self.expect('>')?;
        Ok(name)
    }

    // Enum, hierarchy and field names, bare or quoted
    fn name(&mut self) -> Result<String, CompilerError> {
        if !self.eat('"') {
            return self.identifier();
        }

        let mut name = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '"' => return Ok(name),
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => name.push(escaped),
                    None => break,
                },
                _ => name.push(ch),
            }
        }

        return_type_error!(
            format!("Unterminated quoted name in type '{}'", self.source),
            { FoundType => self.source }
        );
    }

    fn identifier(&mut self) -> Result<String, CompilerError> {
        self.skip_whitespace();

        let mut word = String::new();
        while let Some((_, ch)) = self.chars.peek() {
            if is_name_delimiter(*ch) {
                break;
            }
            word.push(*ch);
            self.chars.next();
        }

        if word.is_empty() {
            return_type_error!(
                format!("Expected a type name in '{}'", self.source),
                { FoundType => self.source }
            );
        }

        Ok(word)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.chars.peek().is_some_and(|(_, ch)| *ch == expected) {
            self.chars.next();
            return true;
        }
        false
    }

    fn expect(&mut self, expected: char) -> Result<(), CompilerError> {
        if self.eat(expected) {
            return Ok(());
        }

        return_type_error!(
            format!("Expected '{}' in type '{}'", expected, self.source),
            { FoundType => self.source }
        );
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|(_, ch)| ch.is_whitespace()) {
            self.chars.next();
        }
    }
}

/// Characters that end a bare name.
pub fn is_name_delimiter(ch: char) -> bool {
    matches!(ch, '<' | '>' | ',' | ':' | '*' | '"' | '\\') || ch.is_whitespace()
}
