//! Token stream over lexed script text
//!
//! The parser walks significant tokens only; the full token list (comments and
//! whitespace included) stays available to the incremental engine.

use crate::{
    tokens::token::*,
    utils::{SourceMap, Span, Spanned},
};

pub type SpannedToken = Spanned<Token>;

#[derive(Debug, Clone)]
pub struct TokenStream {
    all_tokens: Vec<SpannedToken>,
    /// Indices into `all_tokens` of the tokens the parser sees
    significant: Vec<usize>,
    position: usize,
    source_map: Option<SourceMap>,
}

impl TokenStream {
    pub fn new(tokens: Vec<SpannedToken>) -> Self {
        let significant: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.value.is_significant())
            .map(|(i, _)| i)
            .collect();

        crate::log_debug!("Token stream filtered",
            "total_tokens" => tokens.len(),
            "significant_tokens" => significant.len()
        );

        Self {
            all_tokens: tokens,
            significant,
            position: 0,
            source_map: None,
        }
    }

    pub fn with_source_map(tokens: Vec<SpannedToken>, source_map: SourceMap) -> Self {
        Self {
            source_map: Some(source_map),
            ..Self::new(tokens)
        }
    }

    fn at(&self, position: usize) -> Option<&SpannedToken> {
        self.significant
            .get(position)
            .and_then(|&i| self.all_tokens.get(i))
    }

    pub fn current(&self) -> Option<&SpannedToken> {
        self.at(self.position)
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.current().map(|t| &t.value)
    }

    pub fn current_span(&self) -> Option<Span> {
        self.current().map(|t| t.span)
    }

    pub fn peek(&self) -> Option<&SpannedToken> {
        self.peek_ahead(1)
    }

    pub fn peek_ahead(&self, n: usize) -> Option<&SpannedToken> {
        self.at(self.position + n)
    }

    pub fn advance(&mut self) -> Option<&SpannedToken> {
        if self.position < self.significant.len() {
            self.position += 1;
        }
        self.current()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.significant.len()
    }

    /// Number of significant tokens
    pub fn len(&self) -> usize {
        self.significant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.significant.is_empty()
    }

    /// Index of the current significant token
    pub fn position(&self) -> usize {
        self.position
    }

    /// Span from the token at `start` through the token at `end`
    pub fn span_range(&self, start: usize, end: usize) -> Span {
        match (self.at(start), self.at(end)) {
            (Some(a), Some(b)) => a.span.merge(b.span),
            (Some(a), None) => a.span,
            (None, Some(b)) => b.span,
            (None, None) => Span::dummy(),
        }
    }

    /// True when the current token has the same variant as `expected`
    pub fn check_token(&self, expected: &Token) -> bool {
        self.current_token()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    pub fn current_line(&self) -> Option<u32> {
        self.current_span().map(|span| span.start.line)
    }

    /// Move to the first significant token starting at or after `line`
    pub fn seek_line(&mut self, line: u32) {
        self.position = self
            .significant
            .iter()
            .position(|&i| self.all_tokens[i].span.start.line >= line)
            .unwrap_or(self.significant.len());
    }

    /// Skip tokens until one starts after `line`, treating line breaks
    /// inside open brackets or braces as part of the same statement
    pub fn skip_past_line(&mut self, line: u32) {
        let mut depth: i32 = 0;
        while let Some(current) = self.current() {
            if matches!(current.value, Token::Eof) {
                break;
            }
            if current.span.start.line > line && depth <= 0 {
                break;
            }
            match current.value {
                Token::LeftBrace | Token::LeftParen | Token::LeftBracket => depth += 1,
                Token::RightBrace | Token::RightParen | Token::RightBracket => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    pub fn comments(&self) -> impl Iterator<Item = &SpannedToken> {
        self.all_tokens.iter().filter(|t| t.value.is_comment())
    }

    pub fn iter_significant(&self) -> impl Iterator<Item = &SpannedToken> {
        self.significant.iter().map(|&i| &self.all_tokens[i])
    }

    /// Every token including whitespace and comments
    pub fn all_tokens(&self) -> &[SpannedToken] {
        &self.all_tokens
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    /// `a = 1\n// next\nb`
    fn stream() -> TokenStream {
        let pieces = [
            (Token::Identifier("a".to_string()), "a"),
            (Token::Space, " "),
            (Token::Assign, "="),
            (Token::Space, " "),
            (Token::Integer(1), "1"),
            (Token::Newline, "\n"),
            (Token::LineComment(" next".to_string()), "// next"),
            (Token::Newline, "\n"),
            (Token::Identifier("b".to_string()), "b"),
            (Token::Eof, ""),
        ];

        let mut position = Position::start();
        let mut tokens = Vec::new();
        for (token, text) in pieces {
            let end = position.advance_str(text);
            tokens.push(Spanned::new(token, Span::new(position, end)));
            position = end;
        }
        TokenStream::with_source_map(tokens, SourceMap::new("a = 1\n// next\nb".to_string()))
    }

    #[test]
    fn test_significant_filtering() {
        let stream = stream();
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.all_tokens().len(), 10);
        assert_eq!(stream.comments().count(), 1);
        assert!(stream.source_map().is_some());
    }

    #[test]
    fn test_navigation() {
        let mut stream = stream();
        assert!(stream.check_token(&Token::Identifier(String::new())));
        assert_eq!(stream.peek().map(|t| &t.value), Some(&Token::Assign));
        stream.advance();
        stream.advance();
        assert_eq!(stream.current_token(), Some(&Token::Integer(1)));
        assert_eq!(stream.position(), 2);

        let span = stream.span_range(0, 2);
        assert_eq!(span.start.column, 1);
        assert_eq!(span.end.column, 6);
    }

    #[test]
    fn test_line_navigation() {
        let mut stream = stream();
        stream.seek_line(2);
        assert_eq!(stream.current_token(), Some(&Token::Identifier("b".to_string())));
        assert_eq!(stream.current_line(), Some(3));

        let mut stream = super::tests::stream();
        stream.skip_past_line(1);
        assert_eq!(stream.current_line(), Some(3));
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut stream = stream();
        for _ in 0..10 {
            stream.advance();
        }
        assert!(stream.is_at_end());
        assert!(stream.current().is_none());
    }
}
