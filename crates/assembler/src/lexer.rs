//! Tokenizer for CVM assembly text.

use crate::error::AsmError;

/// A single operand token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Any bare word: label names, variable operands, type names.
    Word(String),
    /// An integer literal (decimal or `0x` hex, optional sign).
    Number(i64),
    /// A double-quoted string literal, escapes already processed.
    Str(String),
}

impl Token {
    /// The token as it would appear in source, for error messages.
    pub(crate) fn text(&self) -> String {
        match self {
            Token::Word(w) => w.clone(),
            Token::Number(n) => n.to_string(),
            Token::Str(s) => cvm_common::operand::quote(s),
        }
    }
}

/// One meaningful source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    /// `name:`
    Label(String),
    /// `mnemonic operand...`
    Instruction {
        mnemonic: String,
        operands: Vec<Token>,
    },
}

/// Tokenize a single line of assembly text.
///
/// Returns `None` for blank lines and comment lines. Comments start with
/// `//` or `#` and extend to end of line.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Option<Line>, AsmError> {
    let tokens = scan(line, line_num)?;

    let mut iter = tokens.into_iter();
    let head = match iter.next() {
        Some(head) => head,
        None => return Ok(None),
    };
    let rest: Vec<Token> = iter.collect();

    let word = match head {
        Token::Word(w) => w,
        other => {
            return Err(AsmError::UnexpectedToken {
                line: line_num,
                token: other.text(),
            })
        }
    };

    if let Some(name) = word.strip_suffix(':') {
        if !is_label_name(name) {
            return Err(AsmError::InvalidLabel {
                line: line_num,
                token: word.clone(),
            });
        }
        if let Some(extra) = rest.first() {
            return Err(AsmError::UnexpectedToken {
                line: line_num,
                token: extra.text(),
            });
        }
        return Ok(Some(Line::Label(name.to_string())));
    }

    Ok(Some(Line::Instruction {
        mnemonic: word,
        operands: rest,
    }))
}

/// Split a line into tokens, stopping at a comment.
fn scan(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        if chars[i] == '"' {
            let (s, next) = scan_string(&chars, i + 1, line_num)?;
            if next < chars.len() && !chars[next].is_whitespace() {
                return Err(AsmError::MalformedString { line: line_num });
            }
            tokens.push(Token::Str(s));
            i = next;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        if word.starts_with("//") || word.starts_with('#') {
            break;
        }
        tokens.push(classify(word, line_num)?);
    }

    Ok(tokens)
}

/// Read a string body starting just after the opening quote. Returns the
/// unescaped string and the index just past the closing quote.
fn scan_string(chars: &[char], mut i: usize, line_num: usize) -> Result<(String, usize), AsmError> {
    let mut out = String::new();
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((out, i + 1)),
            '\\' => {
                let escaped = match chars.get(i + 1) {
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some('n') => '\n',
                    Some('t') => '\t',
                    _ => return Err(AsmError::MalformedString { line: line_num }),
                };
                out.push(escaped);
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(AsmError::MalformedString { line: line_num })
}

fn classify(word: String, line_num: usize) -> Result<Token, AsmError> {
    let unsigned = word.strip_prefix(['-', '+']).unwrap_or(&word);
    if !unsigned.as_bytes().first().is_some_and(|b| b.is_ascii_digit()) {
        return Ok(Token::Word(word));
    }
    parse_int(&word)
        .map(Token::Number)
        .ok_or(AsmError::InvalidNumber {
            line: line_num,
            token: word,
        })
}

/// Parse a decimal or `0x` hexadecimal integer with an optional sign.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        i128::from_str_radix(hex, 16).ok()?
    } else {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i128>().ok()?
    };

    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

/// `[A-Za-z_.][A-Za-z0-9_.]*`
pub(crate) fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(mnemonic: &str, operands: Vec<Token>) -> Option<Line> {
        Some(Line::Instruction {
            mnemonic: mnemonic.to_string(),
            operands,
        })
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn empty_line() {
        assert_eq!(tokenize_line("", 1).unwrap(), None);
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(tokenize_line("   \t  ", 1).unwrap(), None);
    }

    #[test]
    fn slash_comment_line() {
        assert_eq!(tokenize_line("// a comment", 1).unwrap(), None);
    }

    #[test]
    fn hash_comment_line() {
        assert_eq!(tokenize_line("  # indented comment", 1).unwrap(), None);
    }

    #[test]
    fn trailing_comment() {
        assert_eq!(
            tokenize_line("add // b + a", 1).unwrap(),
            instr("add", vec![])
        );
    }

    #[test]
    fn label_line() {
        assert_eq!(
            tokenize_line("  .L1:", 1).unwrap(),
            Some(Line::Label(".L1".to_string()))
        );
    }

    #[test]
    fn label_with_trailing_token_rejected() {
        let err = tokenize_line("MAIN: push", 4).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnexpectedToken {
                line: 4,
                token: "push".to_string()
            }
        );
    }

    #[test]
    fn invalid_label_name() {
        let err = tokenize_line("1abc:", 2).unwrap_err();
        assert!(matches!(err, AsmError::InvalidNumber { line: 2, .. }));
        let err = tokenize_line("a-b:", 2).unwrap_err();
        assert!(matches!(err, AsmError::InvalidLabel { line: 2, .. }));
    }

    #[test]
    fn push_decimal() {
        assert_eq!(
            tokenize_line("push 42", 1).unwrap(),
            instr("push", vec![Token::Number(42)])
        );
    }

    #[test]
    fn push_negative() {
        assert_eq!(
            tokenize_line("push -7", 1).unwrap(),
            instr("push", vec![Token::Number(-7)])
        );
    }

    #[test]
    fn push_hex() {
        assert_eq!(
            tokenize_line("push 0x2a", 1).unwrap(),
            instr("push", vec![Token::Number(42)])
        );
    }

    #[test]
    fn push_string_with_spaces() {
        assert_eq!(
            tokenize_line(r#"push "hello world""#, 1).unwrap(),
            instr("push", vec![Token::Str("hello world".to_string())])
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokenize_line(r#"push "a\"b\n""#, 1).unwrap(),
            instr("push", vec![Token::Str("a\"b\n".to_string())])
        );
    }

    #[test]
    fn string_keeps_comment_markers() {
        assert_eq!(
            tokenize_line(r##"push "# not // a comment""##, 1).unwrap(),
            instr("push", vec![Token::Str("# not // a comment".to_string())])
        );
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize_line(r#"push "oops"#, 9).unwrap_err();
        assert_eq!(err, AsmError::MalformedString { line: 9 });
    }

    #[test]
    fn declaration_words() {
        assert_eq!(
            tokenize_line("declareGlobal a[10] int", 1).unwrap(),
            instr("declareGlobal", vec![word("a[10]"), word("int")])
        );
    }

    #[test]
    fn invalid_number() {
        let err = tokenize_line("push 12abc", 5).unwrap_err();
        assert_eq!(
            err,
            AsmError::InvalidNumber {
                line: 5,
                token: "12abc".to_string()
            }
        );
    }

    #[test]
    fn number_out_of_range() {
        let err = tokenize_line("push 99999999999999999999", 1).unwrap_err();
        assert!(matches!(err, AsmError::InvalidNumber { .. }));
    }

    #[test]
    fn parse_int_extremes() {
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int("9223372036854775808"), None);
        assert_eq!(parse_int("-0x10"), Some(-16));
    }

    #[test]
    fn names() {
        assert!(is_label_name(".L3"));
        assert!(is_label_name("FIBONACCI"));
        assert!(!is_label_name(""));
        assert!(is_variable_name("_tmp1"));
        assert!(!is_variable_name(".x"));
        assert!(!is_variable_name("9x"));
    }
}
