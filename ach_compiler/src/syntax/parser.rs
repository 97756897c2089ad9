//! Precedence-climbing parser with global logging integration
//!
//! Failures never abort a parse. Each one becomes an error node at the
//! failure location, is recorded in the error history, and parsing resumes
//! on the next source line so one pass reports every broken statement.

use crate::config::constants::compile_time::syntax::*;
use crate::grammar::ast::{
    ComparisonOperation, ConditionalOperation, ExprRef, Expression, ExpressionKind,
    FunctionDefinition, MathematicOperation, OperationPriority,
};
use crate::grammar::keywords::Keyword;
use crate::interpreter::ErrorExpression;
use crate::logging::codes;
use crate::syntax::error::SyntaxError;
use crate::tokens::{Token, TokenStream};
use crate::utils::Span;
use crate::{log_debug, log_error, log_success};
use std::collections::VecDeque;
use std::rc::Rc;

pub struct ScriptParser {
    tokens: TokenStream,
    context_stack: Vec<String>,
    error_history: VecDeque<SyntaxError>,
    error_count: usize,
    parse_depth: usize,
    /// Set while parsing an `if` condition, where `(x) {` opens the body
    /// rather than an anonymous function
    in_condition: bool,
}

impl ScriptParser {
    pub fn new(tokens: TokenStream) -> Self {
        log_debug!("Creating script parser", "tokens" => tokens.len());

        Self {
            tokens,
            context_stack: Vec::new(),
            error_history: VecDeque::new(),
            error_count: 0,
            parse_depth: 0,
            in_condition: false,
        }
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn into_tokens(self) -> TokenStream {
        self.tokens
    }

    /// Continue parsing at the first statement starting on or after `line`
    pub fn seek_line(&mut self, line: u32) {
        self.tokens.seek_line(line);
    }

    /// Parse every remaining statement
    pub fn parse_all(&mut self) -> Vec<ExprRef> {
        self.push_context("script");
        let mut statements = Vec::new();
        while let Some(statement) = self.parse_statement() {
            statements.push(statement);
        }
        self.pop_context();

        log_success!(codes::success::PARSE_COMPLETE,
            "Script parsing completed",
            "statements" => statements.len(),
            "errors" => self.error_count
        );
        statements
    }

    /// Parse the next top-level statement, `None` at end of input
    pub fn parse_statement(&mut self) -> Option<ExprRef> {
        if self.at_end() {
            return None;
        }

        let start_line = self.tokens.current_line().unwrap_or(1);
        let statement = self.statement();

        if let Some(error) = statement.as_error() {
            let error_line = error.span.start.line.max(start_line);
            // Resume on the line after the failure
            if self.tokens.current_line().map_or(false, |line| line <= error_line) {
                self.tokens.skip_past_line(error_line);
            }
        }
        Some(statement)
    }

    pub fn error_history(&self) -> Vec<&SyntaxError> {
        self.error_history.iter().collect()
    }

    /// Errors seen over the whole parse, including ones evicted from history
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    // === CONTEXT AND ERROR TRACKING ===

    fn push_context(&mut self, context: &str) {
        self.context_stack.push(context.to_string());
    }

    fn pop_context(&mut self) {
        self.context_stack.pop();
    }

    fn current_context(&self) -> String {
        self.context_stack.join(" > ")
    }

    fn record_error(&mut self, error: SyntaxError) -> ExprRef {
        log_error!(error.error_code(), "Syntax error",
            span = error.span().unwrap_or_else(Span::dummy),
            "message" => error.to_string(),
            "context" => self.current_context()
        );

        if self.error_history.len() >= MAX_ERROR_HISTORY {
            self.error_history.pop_front();
        }
        self.error_history.push_back(error.clone());
        self.error_count += 1;
        Expression::error(ErrorExpression::from(error))
    }

    fn unexpected(&mut self, expected: &str) -> ExprRef {
        let span = self.current_span();
        let error = match self.tokens.current_token() {
            None | Some(Token::Eof) => SyntaxError::unexpected_end_of_input(expected, span),
            Some(token) => SyntaxError::unexpected_token(expected, &token.as_source_string(), span),
        };
        self.record_error(error)
    }

    // === TOKEN HELPERS ===

    fn current(&self) -> Option<&Token> {
        self.tokens.current_token()
    }

    fn current_span(&self) -> Span {
        self.tokens.current_span().unwrap_or_else(Span::dummy)
    }

    fn at_end(&self) -> bool {
        matches!(self.current(), None | Some(Token::Eof))
    }

    fn check(&self, expected: &Token) -> bool {
        self.tokens.check_token(expected)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().map_or(false, |t| t.is_keyword(keyword))
    }

    fn advance(&mut self) {
        self.tokens.advance();
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.peek_ahead(offset).map(|t| &t.value)
    }

    /// Span from the token at `start` through the last consumed token
    fn span_since(&self, start: usize) -> Span {
        let end = self.tokens.position().saturating_sub(1).max(start);
        self.tokens.span_range(start, end)
    }

    /// Consume `expected` or produce an error node
    fn expect(&mut self, expected: Token) -> Result<(), ExprRef> {
        if self.check(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected.as_source_string())))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ExprRef> {
        match self.current() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    // === STATEMENTS ===

    fn statement(&mut self) -> ExprRef {
        match self.current() {
            Some(Token::Keyword(Keyword::Function)) => self.function_definition(),
            Some(Token::Keyword(Keyword::If)) => self.if_statement(),
            Some(Token::Keyword(Keyword::For)) => self.for_statement(),
            Some(Token::Keyword(Keyword::Return)) => self.return_statement(),
            Some(Token::Keyword(Keyword::Break)) => {
                let span = self.current_span();
                self.advance();
                Expression::new(ExpressionKind::Break, span)
            }
            Some(Token::Keyword(Keyword::Else)) => {
                let span = self.current_span();
                self.advance();
                self.record_error(SyntaxError::invalid_statement("'else' without 'if'", span))
            }
            _ => {
                let expression = self.expression(OperationPriority::Assign);
                if let ExpressionKind::Variable(name) = &expression.kind {
                    let message = format!("Standalone variable '{}' has no effect", name);
                    return self.record_error(SyntaxError::invalid_statement(
                        &message,
                        expression.span,
                    ));
                }
                expression
            }
        }
    }

    /// `{ statements }`, or a single statement without braces
    fn block(&mut self) -> Result<Vec<ExprRef>, ExprRef> {
        if !self.check(&Token::LeftBrace) {
            let statement = self.statement();
            if statement.is_error() {
                return Err(statement);
            }
            return Ok(vec![statement]);
        }

        let open_span = self.current_span();
        self.advance();
        let mut statements = Vec::new();
        loop {
            if self.check(&Token::RightBrace) {
                self.advance();
                return Ok(statements);
            }
            if self.at_end() {
                return Err(self.record_error(SyntaxError::unmatched_delimiter("}", open_span)));
            }
            let statement = self.statement();
            if statement.is_error() {
                return Err(statement);
            }
            statements.push(statement);
        }
    }

    fn function_definition(&mut self) -> ExprRef {
        let start = self.tokens.position();
        self.push_context("function");
        self.advance();
        let result = self.function_parts();
        self.pop_context();

        match result {
            Ok(definition) => {
                log_debug!("Parsed function definition",
                    "name" => definition.name.as_str(),
                    "parameters" => definition.parameters.len()
                );
                Expression::new(
                    ExpressionKind::FunctionDefinition(Rc::new(definition)),
                    self.span_since(start),
                )
            }
            Err(error) => error,
        }
    }

    fn function_parts(&mut self) -> Result<FunctionDefinition, ExprRef> {
        let name = self.expect_identifier("function name")?;
        self.expect(Token::LeftParen)?;
        let (parameters, defaults) = self.parameter_list()?;
        let body = self.function_body()?;
        Ok(FunctionDefinition {
            name,
            parameters,
            defaults,
            body,
            is_lambda: false,
        })
    }

    /// `=> expression` or a braced block
    fn function_body(&mut self) -> Result<Vec<ExprRef>, ExprRef> {
        if !self.check(&Token::Arrow) {
            return self.block();
        }
        self.advance();
        let value = self.expression(OperationPriority::Assign);
        if value.is_error() {
            return Err(value);
        }
        let span = value.span;
        Ok(vec![Expression::new(ExpressionKind::Return(Some(value)), span)])
    }

    /// Parameters after the opening parenthesis through the closing one.
    /// Parameters with defaults must come last.
    fn parameter_list(&mut self) -> Result<(Vec<String>, Vec<(String, ExprRef)>), ExprRef> {
        let start_span = self.current_span();
        let mut parameters = Vec::new();
        let mut defaults: Vec<(String, ExprRef)> = Vec::new();

        if self.check(&Token::RightParen) {
            self.advance();
            return Ok((parameters, defaults));
        }

        loop {
            let span = self.current_span();
            let name = self.expect_identifier("parameter name")?;
            if parameters.contains(&name) {
                let message = format!("Duplicate parameter '{}'", name);
                return Err(self.record_error(SyntaxError::invalid_statement(&message, span)));
            }

            if self.check(&Token::Assign) {
                self.advance();
                let value = self.expression(OperationPriority::Or);
                if value.is_error() {
                    return Err(value);
                }
                defaults.push((name.clone(), value));
            } else if !defaults.is_empty() {
                let message = format!("Parameter '{}' must have a default value", name);
                return Err(self.record_error(SyntaxError::invalid_statement(&message, span)));
            }
            parameters.push(name);

            if self.check(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect(Token::RightParen)?;
            break;
        }

        if parameters.len() > MAX_FUNCTION_PARAMETERS {
            let span = start_span.merge(self.current_span());
            return Err(self.record_error(SyntaxError::too_many_parameters(
                parameters.len(),
                MAX_FUNCTION_PARAMETERS,
                span,
            )));
        }
        Ok((parameters, defaults))
    }

    fn if_statement(&mut self) -> ExprRef {
        let start = self.tokens.position();
        self.push_context("if");
        self.advance();
        let result = self.if_parts();
        self.in_condition = false;
        self.pop_context();

        match result {
            Ok((condition, then_branch, else_branch)) => Expression::new(
                ExpressionKind::If {
                    condition,
                    then_branch,
                    else_branch,
                },
                self.span_since(start),
            ),
            Err(error) => error,
        }
    }

    fn if_parts(&mut self) -> Result<(ExprRef, Vec<ExprRef>, Vec<ExprRef>), ExprRef> {
        let condition = self.condition()?;
        let then_branch = self.block()?;
        let else_branch = if self.check_keyword(Keyword::Else) {
            self.advance();
            if self.check_keyword(Keyword::If) {
                let nested = self.if_statement();
                if nested.is_error() {
                    return Err(nested);
                }
                vec![nested]
            } else {
                self.block()?
            }
        } else {
            Vec::new()
        };
        Ok((condition, then_branch, else_branch))
    }

    /// Expression followed by a block, where `(x) {` is not a function
    fn condition(&mut self) -> Result<ExprRef, ExprRef> {
        self.in_condition = true;
        let condition = self.expression(OperationPriority::Or);
        self.in_condition = false;
        if condition.is_error() {
            return Err(condition);
        }
        Ok(condition)
    }

    fn for_statement(&mut self) -> ExprRef {
        let start = self.tokens.position();
        self.push_context("for");
        self.advance();
        let result = self.for_parts();
        self.in_condition = false;
        self.pop_context();

        match result {
            Ok((iterator, range, body)) => Expression::new(
                ExpressionKind::For {
                    iterator,
                    range,
                    body,
                },
                self.span_since(start),
            ),
            Err(error) => error,
        }
    }

    fn for_parts(&mut self) -> Result<(String, ExprRef, Vec<ExprRef>), ExprRef> {
        let iterator = self.expect_identifier("loop variable")?;
        if !self.check_keyword(Keyword::In) {
            return Err(self.unexpected("'in'"));
        }
        self.advance();
        let range = self.condition()?;
        let body = self.block()?;
        Ok((iterator, range, body))
    }

    fn return_statement(&mut self) -> ExprRef {
        let start = self.tokens.position();
        let line = self.tokens.current_line();
        self.advance();

        // A value must start on the same line as `return`
        let has_value = !self.at_end()
            && !self.check(&Token::RightBrace)
            && self.tokens.current_line() == line;
        let value = if has_value {
            let value = self.expression(OperationPriority::Assign);
            if value.is_error() {
                return value;
            }
            Some(value)
        } else {
            None
        };
        Expression::new(ExpressionKind::Return(value), self.span_since(start))
    }

    // === EXPRESSIONS ===

    /// Parse an expression whose operators bind at least as tightly as
    /// `priority`
    pub fn expression(&mut self, priority: OperationPriority) -> ExprRef {
        if self.parse_depth >= MAX_PARSE_DEPTH {
            let span = self.current_span();
            return self.record_error(SyntaxError::max_recursion_depth(span));
        }

        self.parse_depth += 1;
        let result = self.binary_expression(priority);
        self.parse_depth -= 1;
        result
    }

    fn binary_expression(&mut self, priority: OperationPriority) -> ExprRef {
        let start = self.tokens.position();
        let mut left = self.unary_expression();
        if left.is_error() {
            return left;
        }

        loop {
            let Some(token) = self.current().cloned() else {
                break;
            };

            let operator_priority = match &token {
                Token::Assign => OperationPriority::Assign,
                Token::Or => OperationPriority::Or,
                Token::And => OperationPriority::And,
                t if t.is_comparison_operator() => OperationPriority::Compare,
                Token::Plus if matches!(left.kind, ExpressionKind::String(_)) => {
                    OperationPriority::AppendString
                }
                t => match MathematicOperation::from_token(t) {
                    Some(operation) => operation.priority(),
                    None => break,
                },
            };
            if operator_priority < priority {
                break;
            }

            self.advance();
            let right = if token == Token::Assign {
                // Right associative
                self.expression(OperationPriority::Assign)
            } else {
                self.expression(operator_priority.next())
            };
            if right.is_error() {
                return right;
            }

            let span = self.span_since(start);
            left = match token {
                Token::Assign => {
                    if !matches!(
                        left.kind,
                        ExpressionKind::Variable(_) | ExpressionKind::Index { .. }
                    ) {
                        let message = format!("Cannot assign to {}", left.type_name());
                        return self
                            .record_error(SyntaxError::invalid_statement(&message, left.span));
                    }
                    Expression::new(
                        ExpressionKind::Assignment {
                            target: left,
                            value: right,
                        },
                        span,
                    )
                }
                Token::Or => conditional(ConditionalOperation::Or, left, right, span),
                Token::And => conditional(ConditionalOperation::And, left, right, span),
                ref t => match ComparisonOperation::from_token(t) {
                    Some(operation) => Expression::new(
                        ExpressionKind::Comparison {
                            left,
                            operation,
                            right,
                        },
                        span,
                    ),
                    None => match MathematicOperation::from_token(t) {
                        Some(operation) => Expression::new(
                            ExpressionKind::Mathematic {
                                left,
                                operation,
                                right,
                            },
                            span,
                        ),
                        None => break,
                    },
                },
            };
        }

        left
    }

    fn unary_expression(&mut self) -> ExprRef {
        let start = self.tokens.position();
        match self.current() {
            Some(Token::Not) => {
                self.advance();
                let operand = self.expression(OperationPriority::Not);
                if operand.is_error() {
                    return operand;
                }
                Expression::new(
                    ExpressionKind::Conditional {
                        operation: ConditionalOperation::Not,
                        operands: vec![operand],
                    },
                    self.span_since(start),
                )
            }
            Some(Token::Minus) => {
                match self.peek(1) {
                    Some(Token::Integer(value)) => {
                        let value = -*value;
                        self.advance();
                        self.advance();
                        return self.postfix(Expression::integer(value, self.span_since(start)));
                    }
                    Some(Token::Float(value)) => {
                        let value = -*value;
                        self.advance();
                        self.advance();
                        return self.postfix(Expression::float(value, self.span_since(start)));
                    }
                    _ => {}
                }
                self.advance();
                let operand = self.expression(OperationPriority::Negate);
                if operand.is_error() {
                    return operand;
                }
                Expression::new(ExpressionKind::Negate(operand), self.span_since(start))
            }
            _ => {
                let primary = self.primary_expression();
                if primary.is_error() {
                    return primary;
                }
                self.postfix(primary)
            }
        }
    }

    /// Trailing `[index]` accesses
    fn postfix(&mut self, mut expression: ExprRef) -> ExprRef {
        while self.check(&Token::LeftBracket) {
            let start_span = expression.span;
            self.advance();
            let index = self.expression(OperationPriority::Assign);
            if index.is_error() {
                return index;
            }
            if let Err(error) = self.expect(Token::RightBracket) {
                return error;
            }
            let end_span = self.span_since(self.tokens.position().saturating_sub(1));
            expression = Expression::new(
                ExpressionKind::Index {
                    target: expression,
                    index,
                },
                start_span.merge(end_span),
            );
        }
        expression
    }

    fn primary_expression(&mut self) -> ExprRef {
        let span = self.current_span();
        let Some(token) = self.current().cloned() else {
            return self.unexpected("expression");
        };

        match token {
            Token::Integer(value) => {
                self.advance();
                Expression::integer(value, span)
            }
            Token::Float(value) => {
                self.advance();
                Expression::float(value, span)
            }
            Token::StringLiteral(value) => {
                self.advance();
                Expression::string(value, span)
            }
            Token::Boolean(value) => {
                self.advance();
                Expression::boolean(value, span)
            }
            Token::Identifier(name) => {
                self.advance();
                if self.check(&Token::LeftParen) {
                    self.function_call(name, span)
                } else {
                    Expression::new(ExpressionKind::Variable(name), span)
                }
            }
            Token::LeftParen => {
                if let Some(lambda) = self.try_anonymous_function() {
                    return lambda;
                }
                self.parenthesized()
            }
            Token::LeftBracket => self.array_literal(),
            Token::LeftBrace => self.dictionary_literal(),
            _ => self.unexpected("expression"),
        }
    }

    fn parenthesized(&mut self) -> ExprRef {
        let open_span = self.current_span();
        self.advance();
        let saved_condition = std::mem::replace(&mut self.in_condition, false);
        let inner = self.expression(OperationPriority::Assign);
        self.in_condition = saved_condition;
        if inner.is_error() {
            return inner;
        }
        if !self.check(&Token::RightParen) {
            if self.at_end() {
                return self.record_error(SyntaxError::unmatched_delimiter(")", open_span));
            }
            return self.unexpected("')'");
        }
        self.advance();
        Expression::as_logical_unit(&inner)
    }

    fn function_call(&mut self, name: String, name_span: Span) -> ExprRef {
        self.push_context(&format!("call {}", name));
        self.advance();

        let mut arguments = Vec::new();
        let result = loop {
            if self.check(&Token::RightParen) {
                self.advance();
                break Ok(());
            }

            let argument = if matches!(self.current(), Some(Token::Identifier(_)))
                && matches!(self.peek(1), Some(Token::Assign))
            {
                // name = value
                let start = self.tokens.position();
                let target = match self.current() {
                    Some(Token::Identifier(parameter)) => parameter.clone(),
                    _ => String::new(),
                };
                let target_span = self.current_span();
                self.advance();
                self.advance();
                let value = self.expression(OperationPriority::Or);
                if value.is_error() {
                    break Err(value);
                }
                Expression::new(
                    ExpressionKind::Assignment {
                        target: Expression::new(ExpressionKind::Variable(target), target_span),
                        value,
                    },
                    self.span_since(start),
                )
            } else {
                let value = self.expression(OperationPriority::Or);
                if value.is_error() {
                    break Err(value);
                }
                value
            };
            arguments.push(argument);

            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&Token::RightParen) {
                if self.at_end() {
                    break Err(self.record_error(SyntaxError::unmatched_delimiter(")", name_span)));
                }
                break Err(self.unexpected("',' or ')'"));
            }
        };
        self.pop_context();

        match result {
            Ok(()) => {
                let end = self.span_since(self.tokens.position().saturating_sub(1));
                Expression::new(
                    ExpressionKind::FunctionCall { name, arguments },
                    name_span.merge(end),
                )
            }
            Err(error) => error,
        }
    }

    /// `(a, b) => expr` or `(a, b) { ... }`. Restores the stream and
    /// returns `None` when the parenthesis opens a grouped expression.
    fn try_anonymous_function(&mut self) -> Option<ExprRef> {
        let start = self.tokens.position();

        // Lookahead: identifiers separated by commas, then `)` and `=>` or `{`
        let mut offset = 1;
        loop {
            if offset > MAX_LOOKAHEAD_TOKENS {
                return None;
            }
            match self.peek(offset) {
                Some(Token::RightParen) if offset == 1 => break,
                Some(Token::Identifier(_)) => {}
                _ => return None,
            }
            match self.peek(offset + 1) {
                Some(Token::Comma) => offset += 2,
                Some(Token::RightParen) => {
                    offset += 1;
                    break;
                }
                _ => return None,
            }
        }
        match self.peek(offset + 1) {
            Some(Token::Arrow) => {}
            Some(Token::LeftBrace) if !self.in_condition => {}
            _ => return None,
        }

        self.push_context("anonymous function");
        self.advance();
        let result = self.lambda_parts();
        self.pop_context();

        Some(match result {
            Ok(definition) => Expression::new(
                ExpressionKind::FunctionDefinition(Rc::new(definition)),
                self.span_since(start),
            ),
            Err(error) => error,
        })
    }

    fn lambda_parts(&mut self) -> Result<FunctionDefinition, ExprRef> {
        let (parameters, defaults) = self.parameter_list()?;
        let body = self.function_body()?;
        Ok(FunctionDefinition {
            name: String::new(),
            parameters,
            defaults,
            body,
            is_lambda: true,
        })
    }

    fn array_literal(&mut self) -> ExprRef {
        let start = self.tokens.position();
        let open_span = self.current_span();
        self.advance();

        let mut items = Vec::new();
        loop {
            if self.check(&Token::RightBracket) {
                self.advance();
                break;
            }
            if self.at_end() {
                return self.record_error(SyntaxError::unmatched_delimiter("]", open_span));
            }
            let item = self.expression(OperationPriority::Or);
            if item.is_error() {
                return item;
            }
            items.push(item);
            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&Token::RightBracket) {
                return self.unexpected("',' or ']'");
            }
        }
        Expression::new(ExpressionKind::ArrayLiteral(items), self.span_since(start))
    }

    fn dictionary_literal(&mut self) -> ExprRef {
        let start = self.tokens.position();
        let open_span = self.current_span();
        self.advance();

        let mut entries = Vec::new();
        loop {
            if self.check(&Token::RightBrace) {
                self.advance();
                break;
            }
            if self.at_end() {
                return self.record_error(SyntaxError::unmatched_delimiter("}", open_span));
            }
            let key = self.expression(OperationPriority::Or);
            if key.is_error() {
                return key;
            }
            if let Err(error) = self.expect(Token::Colon) {
                return error;
            }
            let value = self.expression(OperationPriority::Or);
            if value.is_error() {
                return value;
            }
            entries.push((key, value));
            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&Token::RightBrace) {
                return self.unexpected("',' or '}'");
            }
        }
        Expression::new(
            ExpressionKind::DictionaryLiteral(entries),
            self.span_since(start),
        )
    }
}

/// Join two operands, flattening a left operand of the same operation
fn conditional(
    operation: ConditionalOperation,
    left: ExprRef,
    right: ExprRef,
    span: Span,
) -> ExprRef {
    let mut operands = match &left.kind {
        ExpressionKind::Conditional {
            operation: left_operation,
            operands,
        } if *left_operation == operation && !left.is_logical_unit => operands.clone(),
        _ => vec![left],
    };
    operands.push(right);
    Expression::new(ExpressionKind::Conditional { operation, operands }, span)
}

pub fn create_parser(tokens: TokenStream) -> ScriptParser {
    ScriptParser::new(tokens)
}
