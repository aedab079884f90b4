//! Tokenizing primitives shared by every text format.
//!
//! Quoted literals and braced blocks are lifted out of the text into side tables
//! and replaced by typed placeholders. Splitting the remaining text on whitespace
//! then never looks inside a literal, and a literal can never be mistaken for a
//! placeholder.
use std::mem;

use crate::error::CommonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuoteId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// A run of source text after literal extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Quote(QuoteId),
    Block(BlockId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Quote(QuoteId),
    Block(BlockId),
    Newline,
}

impl Token {
    pub fn is(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w == word)
    }

    pub fn is_ignore_case(&self, word: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(word))
    }

    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn quote(&self) -> Option<QuoteId> {
        match self {
            Token::Quote(id) => Some(*id),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<BlockId> {
        match self {
            Token::Block(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_newline(&self) -> bool {
        matches!(self, Token::Newline)
    }
}

/// Byte index of the first `//` that is not inside a quote.
fn comment_start(line: &str, quote_chars: &[char]) -> Option<usize> {
    let mut open: Option<char> = None;
    let mut chars = line.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match open {
            Some(quote) if c == quote => open = None,
            Some(_) => {}
            None if quote_chars.contains(&c) => open = Some(c),
            None if c == '/' && matches!(chars.peek(), Some((_, '/'))) => return Some(index),
            None => {}
        }
    }

    None
}

/// Removes `//` comments, keeping any `//` that sits inside a quote on its line.
///
/// Line structure is preserved.
pub fn strip_line_comments(text: &str, quote_chars: &[char]) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        match comment_start(line, quote_chars) {
            Some(index) => {
                out.push_str(&line[..index]);

                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }

    out
}

/// Drops every line whose first non-blank characters are `//`.
pub fn strip_whole_line_comments(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect()
}

/// Removes `/* ... */` comments. An unterminated comment runs to the end of the text.
pub fn strip_block_comments(text: &str) -> String {
    let mut out = text.to_string();

    while let Some(start) = out.find("/*") {
        let end = out[start + 2..]
            .find("*/")
            .map(|index| start + 2 + index + 2)
            .unwrap_or(out.len());

        out.replace_range(start..end, "");
    }

    out
}

/// Surrounds every character of `symbols` with spaces.
pub fn pad_symbols(text: &str, symbols: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if symbols.contains(c) {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else {
            out.push(c);
        }
    }

    out
}

/// Collapses whitespace runs to a single space and trims both ends.
pub fn compact_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn flush_word(word: &mut String, tokens: &mut Vec<Token>) {
    if !word.is_empty() {
        tokens.push(Token::Word(mem::take(word)));
    }
}

/// Splits pieces into tokens.
///
/// Every character of `symbols` becomes a token of its own. With `newlines`,
/// line breaks become [`Token::Newline`], collapsing consecutive ones.
pub fn tokenize(pieces: &[Piece], symbols: &str, newlines: bool) -> Vec<Token> {
    let mut tokens = vec![];
    let mut word = String::new();

    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                for c in text.chars() {
                    if symbols.contains(c) {
                        flush_word(&mut word, &mut tokens);
                        tokens.push(Token::Word(c.to_string()));
                    } else if c == '\n' && newlines {
                        flush_word(&mut word, &mut tokens);

                        if !matches!(tokens.last(), Some(Token::Newline)) {
                            tokens.push(Token::Newline);
                        }
                    } else if c.is_whitespace() {
                        flush_word(&mut word, &mut tokens);
                    } else {
                        word.push(c);
                    }
                }

                // text pieces are separated by placeholders
                flush_word(&mut word, &mut tokens);
            }
            Piece::Quote(id) => tokens.push(Token::Quote(*id)),
            Piece::Block(id) => tokens.push(Token::Block(*id)),
        }
    }

    flush_word(&mut word, &mut tokens);

    tokens
}

/// Checks that `open`/`close` nesting stays within `min..=max` and ends at zero.
pub fn check_depth(
    tokens: &[Token],
    open: &str,
    close: &str,
    min: i64,
    max: i64,
) -> Result<(), CommonError> {
    let mut depth = 0i64;

    for (index, token) in tokens.iter().enumerate() {
        if token.is(open) {
            depth += 1;
        } else if token.is(close) {
            depth -= 1;
        } else {
            continue;
        }

        if depth < min || depth > max {
            return CommonError::BracketDepth {
                open: open.to_string(),
                close: close.to_string(),
                depth,
                min,
                max,
                index,
            }
            .to_result();
        }
    }

    if depth != 0 {
        return CommonError::UnbalancedBrackets {
            open: open.to_string(),
            close: close.to_string(),
            depth,
        }
        .to_result();
    }

    Ok(())
}

/// Token `offset` positions away from `base`, not counting newline tokens.
pub fn get_token(tokens: &[Token], base: usize, offset: isize) -> Option<(usize, &Token)> {
    let mut index = base;
    let mut remaining = offset.unsigned_abs();

    while remaining > 0 {
        index = if offset > 0 {
            index.checked_add(1)?
        } else {
            index.checked_sub(1)?
        };

        if !tokens.get(index)?.is_newline() {
            remaining -= 1;
        }
    }

    tokens.get(index).map(|token| (index, token))
}

/// Index of the first token at or after `from` equal to `word`.
pub fn find_word(tokens: &[Token], from: usize, word: &str) -> Option<usize> {
    tokens
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, token)| token.is(word))
        .map(|(index, _)| index)
}

/// Index of the token closing the bracket opened at `open_index`.
pub fn find_closing(tokens: &[Token], open_index: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (index, token) in tokens.iter().enumerate().skip(open_index) {
        if token.is(open) {
            depth += 1;
        } else if token.is(close) {
            depth = depth.checked_sub(1)?;

            if depth == 0 {
                return Some(index);
            }
        }
    }

    None
}

/// Source text with quoted literals, and optionally braced blocks, lifted out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexed {
    pub pieces: Vec<Piece>,
    pub quotes: Vec<String>,
    pub blocks: Vec<Vec<Piece>>,
}

impl Lexed {
    /// Extracts literals delimited by any of `quote_chars`.
    ///
    /// A literal is closed only by the character that opened it.
    pub fn new(text: &str, quote_chars: &[char]) -> Result<Self, CommonError> {
        let mut pieces = vec![];
        let mut quotes = vec![];
        let mut buffer = String::new();
        let mut open: Option<(char, usize)> = None;

        for (offset, c) in text.chars().enumerate() {
            match open {
                Some((quote, _)) if c == quote => {
                    pieces.push(Piece::Quote(QuoteId(quotes.len())));
                    quotes.push(mem::take(&mut buffer));
                    open = None;
                }
                Some(_) => buffer.push(c),
                None if quote_chars.contains(&c) => {
                    if !buffer.is_empty() {
                        pieces.push(Piece::Text(mem::take(&mut buffer)));
                    }

                    open = Some((c, offset));
                }
                None => buffer.push(c),
            }
        }

        if let Some((quote, offset)) = open {
            return CommonError::UnterminatedQuote { quote, offset }.to_result();
        }

        if !buffer.is_empty() {
            pieces.push(Piece::Text(buffer));
        }

        Ok(Self {
            pieces,
            quotes,
            blocks: vec![],
        })
    }

    /// Moves every top level `{ ... }` into the block table.
    ///
    /// The block is replaced by its placeholder followed by `terminator`, so
    /// statement splitting still sees the block end a statement.
    pub fn extract_blocks(&mut self, terminator: &str) -> Result<(), CommonError> {
        let mut out = vec![];
        let mut text = String::new();
        let mut block = vec![];
        let mut block_text = String::new();
        let mut depth = 0usize;
        let mut offset = 0usize;

        for piece in mem::take(&mut self.pieces) {
            match piece {
                Piece::Text(chunk) => {
                    for c in chunk.chars() {
                        offset += 1;

                        match c {
                            '{' => {
                                if depth > 0 {
                                    block_text.push(c);
                                }

                                depth += 1;
                            }
                            '}' => {
                                if depth == 0 {
                                    return CommonError::UnexpectedBlockClose { offset }
                                        .to_result();
                                }

                                depth -= 1;

                                if depth > 0 {
                                    block_text.push(c);
                                    continue;
                                }

                                if !block_text.is_empty() {
                                    block.push(Piece::Text(mem::take(&mut block_text)));
                                }

                                if !text.is_empty() {
                                    out.push(Piece::Text(mem::take(&mut text)));
                                }

                                out.push(Piece::Block(BlockId(self.blocks.len())));
                                self.blocks.push(mem::take(&mut block));

                                text.push(' ');
                                text.push_str(terminator);
                                text.push(' ');
                            }
                            _ if depth > 0 => block_text.push(c),
                            _ => text.push(c),
                        }
                    }
                }
                other => {
                    if depth > 0 {
                        if !block_text.is_empty() {
                            block.push(Piece::Text(mem::take(&mut block_text)));
                        }

                        block.push(other);
                    } else {
                        if !text.is_empty() {
                            out.push(Piece::Text(mem::take(&mut text)));
                        }

                        out.push(other);
                    }
                }
            }
        }

        if depth > 0 {
            return CommonError::UnclosedBlock { depth }.to_result();
        }

        if !text.is_empty() {
            out.push(Piece::Text(text));
        }

        self.pieces = out;

        Ok(())
    }

    pub fn quote(&self, id: QuoteId) -> Option<&str> {
        self.quotes.get(id.0).map(String::as_str)
    }

    /// Stores a new literal, e.g. one merged from several others.
    pub fn push_quote(&mut self, text: String) -> QuoteId {
        self.quotes.push(text);
        QuoteId(self.quotes.len() - 1)
    }

    pub fn block(&self, id: BlockId) -> Option<&[Piece]> {
        self.blocks.get(id.0).map(Vec::as_slice)
    }

    /// Text of a word or quote token.
    pub fn text<'a>(&'a self, token: &'a Token) -> Option<&'a str> {
        match token {
            Token::Word(word) => Some(word),
            Token::Quote(id) => self.quote(*id),
            _ => None,
        }
    }

    pub fn tokens(&self, symbols: &str, newlines: bool) -> Vec<Token> {
        tokenize(&self.pieces, symbols, newlines)
    }

    pub fn block_tokens(&self, id: BlockId, symbols: &str, newlines: bool) -> Vec<Token> {
        self.block(id)
            .map(|pieces| tokenize(pieces, symbols, newlines))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_comment_outside_quote() {
        let i = "\"a\" \"b\" // comment\n\"url\" \"http://x\" // tail\n";
        let out = strip_line_comments(i, &['"']);

        assert_eq!(out, "\"a\" \"b\" \n\"url\" \"http://x\" \n");
    }

    #[test]
    fn line_comment_single_quote() {
        let i = "x = 'a//b' // gone";

        assert_eq!(strip_line_comments(i, &['"', '\'']), "x = 'a//b' ");
        assert_eq!(strip_line_comments(i, &['"']), "x = 'a");
    }

    #[test]
    fn whole_line_comment() {
        let i = "// entity 0\n{\n  // brush\n\"a\" \"b\" // kept\n}\n";

        assert_eq!(strip_whole_line_comments(i), "{\n\"a\" \"b\" // kept\n}\n");
    }

    #[test]
    fn block_comments() {
        assert_eq!(strip_block_comments("a /* b */ c /* d */ e"), "a  c  e");
        assert_eq!(strip_block_comments("a /* never closed"), "a ");
        assert_eq!(strip_block_comments("a /* x /* y */ b"), "a  b");
    }

    #[test]
    fn padding_and_compaction() {
        let padded = pad_symbols("a=(b,c)", "=(),");

        assert_eq!(padded, "a =  ( b , c ) ");
        assert_eq!(compact_whitespace(&padded), "a = ( b , c )");
        assert_eq!(compact_whitespace("  \t x \n\n y  "), "x y");
    }

    #[test]
    fn quotes_closed_by_same_char() {
        let lexed = Lexed::new("key \"it's\" 'say \"hi\"' end", &['"', '\'']).unwrap();

        assert_eq!(lexed.quotes, vec!["it's", "say \"hi\""]);
        assert_eq!(
            lexed.pieces,
            vec![
                Piece::Text("key ".to_string()),
                Piece::Quote(QuoteId(0)),
                Piece::Text(" ".to_string()),
                Piece::Quote(QuoteId(1)),
                Piece::Text(" end".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_quote_fails() {
        let err = Lexed::new("a \"b", &['"']).unwrap_err();

        assert!(matches!(
            err,
            CommonError::UnterminatedQuote {
                quote: '"',
                offset: 2
            }
        ));
    }

    #[test]
    fn placeholder_text_is_literal() {
        let lexed = Lexed::new("%%q_0 \"%%q_0\"", &['"']).unwrap();
        let tokens = lexed.tokens("", false);

        assert_eq!(tokens[0], Token::Word("%%q_0".to_string()));
        assert_eq!(tokens[1], Token::Quote(QuoteId(0)));
        assert_eq!(lexed.text(&tokens[1]), Some("%%q_0"));
    }

    #[test]
    fn tokenize_symbols_and_newlines() {
        let lexed = Lexed::new("name(string) : \"Name\"\n\n\nnext=[ ]", &['"']).unwrap();
        let tokens = lexed.tokens("()[]:=", true);

        let words: Vec<Option<&str>> = tokens.iter().map(|t| lexed.text(t)).collect();

        assert_eq!(
            words,
            vec![
                Some("name"),
                Some("("),
                Some("string"),
                Some(")"),
                Some(":"),
                Some("Name"),
                None,
                Some("next"),
                Some("="),
                Some("["),
                Some("]"),
            ]
        );
        assert!(tokens[6].is_newline());
    }

    #[test]
    fn blocks_are_extracted() {
        let mut lexed =
            Lexed::new("struct A { var int x; var string s; } ; var A a;", &['"']).unwrap();
        lexed.extract_blocks(";").unwrap();

        let tokens = lexed.tokens(";", false);
        let block = tokens.iter().find_map(Token::block).unwrap();
        let inner = lexed.block_tokens(block, ";", false);

        assert_eq!(lexed.blocks.len(), 1);
        assert_eq!(tokens[0], Token::Word("struct".to_string()));
        assert_eq!(tokens[2], Token::Block(BlockId(0)));
        assert!(tokens[3].is(";"));
        assert_eq!(inner.iter().filter(|t| t.is(";")).count(), 2);
    }

    #[test]
    fn nested_blocks_stay_inside() {
        let mut lexed = Lexed::new("a { b { \"c}\" } } d", &['"']).unwrap();
        lexed.extract_blocks(";").unwrap();

        assert_eq!(lexed.blocks.len(), 1);
        assert_eq!(
            lexed.blocks[0],
            vec![
                Piece::Text(" b { ".to_string()),
                Piece::Quote(QuoteId(0)),
                Piece::Text(" } ".to_string()),
            ]
        );
    }

    #[test]
    fn unbalanced_blocks_fail() {
        let mut lexed = Lexed::new("a { b", &[]).unwrap();
        assert!(lexed.extract_blocks(";").is_err());

        let mut lexed = Lexed::new("a } b", &[]).unwrap();
        assert!(lexed.extract_blocks(";").is_err());
    }

    #[test]
    fn depth_window() {
        let lexed = Lexed::new("[ [ ] ] [ [ [ ] ] ]", &[]).unwrap();
        let tokens = lexed.tokens("[]", false);

        assert!(check_depth(&tokens[..4], "[", "]", 0, 2).is_ok());
        assert!(matches!(
            check_depth(&tokens, "[", "]", 0, 2),
            Err(CommonError::BracketDepth { depth: 3, .. })
        ));
        assert!(matches!(
            check_depth(&tokens[..3], "[", "]", 0, 2),
            Err(CommonError::UnbalancedBrackets { depth: 1, .. })
        ));
    }

    #[test]
    fn positional_lookup_skips_newlines() {
        let lexed = Lexed::new("a\n\nb\nc", &[]).unwrap();
        let tokens = lexed.tokens("", true);

        assert_eq!(get_token(&tokens, 0, 1), Some((2, &Token::Word("b".to_string()))));
        assert_eq!(get_token(&tokens, 4, -2), Some((0, &Token::Word("a".to_string()))));
        assert_eq!(get_token(&tokens, 4, 1), None);
        assert_eq!(find_closing(&tokens, 0, "a", "c"), Some(4));
        assert_eq!(find_closing(&tokens, 0, "a", "b"), Some(2));
        assert_eq!(find_word(&tokens, 1, "c"), Some(4));
    }
}
