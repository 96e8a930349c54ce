//! Statement keywords and operand parsing
//!
//! Every statement is parsed in full before it executes, so a statement in a
//! skipped branch still advances the token cursor correctly.

use std::collections::HashMap;

use crate::alias::{Alias, AliasTable};
use crate::driver::{Key, Locator, LocatorKind, MouseStep};
use crate::error::{Failure, ScriptResult};
use crate::geometry::{Axis, AxisPair};
use crate::source::{Bindings, Block, TokenArena, TokenSource};
use crate::token::{Token, TokenKind};

/// The fixed statement vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Version,
    Default,
    Browser,
    Include,
    Call,
    Alias,
    Locate(LocatorKind),
    Log,
    Dump,
    Info,
    Click,
    ClickNow,
    Screenshot,
    Sleep,
    Tag,
    Not,
    Displayed,
    Enabled,
    Selected,
    At,
    Size,
    Check,
    Checksum,
    Wait,
    WaitFor,
    Echo,
    Set,
    Send,
    Clear,
    Press,
    SendKey,
    Push,
    Pop,
    Exec,
    ExecInclude,
    If,
    Then,
    Endif,
    Fail,
    Mouse,
    While,
    ScrollIntoView,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("version", Keyword::Version),
    ("default", Keyword::Default),
    ("browser", Keyword::Browser),
    ("include", Keyword::Include),
    ("call", Keyword::Call),
    ("alias", Keyword::Alias),
    ("function", Keyword::Alias),
    ("select", Keyword::Locate(LocatorKind::Css)),
    ("xpath", Keyword::Locate(LocatorKind::XPath)),
    ("test-id", Keyword::Locate(LocatorKind::TestId)),
    ("field", Keyword::Locate(LocatorKind::Field)),
    ("log", Keyword::Log),
    ("dump", Keyword::Dump),
    ("info", Keyword::Info),
    ("click", Keyword::Click),
    ("click-now", Keyword::ClickNow),
    ("screenshot", Keyword::Screenshot),
    ("sleep", Keyword::Sleep),
    ("tag", Keyword::Tag),
    ("not", Keyword::Not),
    ("displayed", Keyword::Displayed),
    ("enabled", Keyword::Enabled),
    ("selected", Keyword::Selected),
    ("at", Keyword::At),
    ("size", Keyword::Size),
    ("check", Keyword::Check),
    ("checksum", Keyword::Checksum),
    ("wait", Keyword::Wait),
    ("wait-for", Keyword::WaitFor),
    ("echo", Keyword::Echo),
    ("set", Keyword::Set),
    ("send", Keyword::Send),
    ("clear", Keyword::Clear),
    ("press", Keyword::Press),
    ("sendkey", Keyword::SendKey),
    ("push", Keyword::Push),
    ("pop", Keyword::Pop),
    ("exec", Keyword::Exec),
    ("exec-include", Keyword::ExecInclude),
    ("if", Keyword::If),
    ("then", Keyword::Then),
    ("endif", Keyword::Endif),
    ("fail", Keyword::Fail),
    ("mouse", Keyword::Mouse),
    ("while", Keyword::While),
    ("scroll-into-view", Keyword::ScrollIntoView),
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(name, _)| *name == word)
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(&self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| keyword == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}

/// `browser ...` sub-commands
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserCommand {
    Start,
    Connect(String),
    Size(u32, u32),
    Chrome(u32, u32),
    Get(String),
    Close,
    Wait(f64),
    Back,
    Forward,
    Refresh,
    Send(String),
    Headless(bool),
    /// Extra browser launch argument
    Option(String),
    Prefs(String, String),
}

/// A fully parsed statement
#[derive(Debug, Clone)]
pub enum Statement {
    Version,
    DefaultWait(f64),
    DefaultScreenshot(String),
    Browser(BrowserCommand),
    Include(String),
    Call {
        name: String,
        args: Vec<serde_json::Value>,
    },
    DefineAlias(Alias),
    Invoke {
        name: String,
        bindings: Bindings,
    },
    Locate(Locator),
    LogAuto(bool),
    LogDump,
    Dump,
    Info,
    Click,
    ClickNow,
    Screenshot(String),
    Sleep(f64),
    Tag(String),
    Not,
    Displayed(bool),
    Enabled(bool),
    Selected(bool),
    At(AxisPair),
    Size(AxisPair),
    Check(String),
    Checksum(u32),
    Wait(f64),
    WaitForNavigation,
    PushWait,
    PopWait,
    Echo(String),
    Set(String),
    Send(String),
    Clear,
    Press(Key),
    Exec {
        command: String,
        args: Vec<String>,
        include: bool,
    },
    If,
    Then,
    Endif,
    Fail(String),
    Mouse(Vec<MouseStep>),
    While(Block),
    ScrollIntoView,
}

impl Statement {
    /// Control statements run even while a branch is skipped
    pub fn is_control(&self) -> bool {
        matches!(self, Statement::If | Statement::Then | Statement::Endif)
    }
}

/// `on|yes|true` / `off|no|false`, case-insensitive
pub fn parse_truthy(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" => Some(true),
        "off" | "no" | "false" => Some(false),
        _ => None,
    }
}

/// Reads one statement's operands from a token source
pub struct StatementParser<'a> {
    source: &'a mut dyn TokenSource,
    arena: &'a mut TokenArena,
    aliases: &'a AliasTable,
}

impl<'a> StatementParser<'a> {
    pub fn new(
        source: &'a mut dyn TokenSource,
        arena: &'a mut TokenArena,
        aliases: &'a AliasTable,
    ) -> Self {
        Self {
            source,
            arena,
            aliases,
        }
    }

    /// Parse the statement introduced by `first`
    pub fn parse(&mut self, first: &Token) -> ScriptResult<Statement> {
        if first.kind != TokenKind::Word {
            return Err(Failure::syntax(format!("unexpected {}", first.kind), first));
        }
        let keyword = match Keyword::lookup(&first.text) {
            Some(keyword) if first.quote.is_none() => keyword,
            _ => return self.parse_invocation(first),
        };

        let statement = match keyword {
            Keyword::Version => Statement::Version,
            Keyword::Default => self.parse_default()?,
            Keyword::Browser => Statement::Browser(self.parse_browser()?),
            Keyword::Include => Statement::Include(self.text()?),
            Keyword::Call => self.parse_call()?,
            Keyword::Alias => Statement::DefineAlias(self.parse_alias()?),
            Keyword::Locate(kind) => Statement::Locate(Locator::new(kind, self.text()?)),
            Keyword::Log => self.parse_log()?,
            Keyword::Dump => Statement::Dump,
            Keyword::Info => Statement::Info,
            Keyword::Click => Statement::Click,
            Keyword::ClickNow => Statement::ClickNow,
            Keyword::Screenshot => Statement::Screenshot(self.text()?),
            Keyword::Sleep => Statement::Sleep(self.number()?),
            Keyword::Tag => Statement::Tag(self.text()?),
            Keyword::Not => Statement::Not,
            Keyword::Displayed => Statement::Displayed(self.optional_truthy()),
            Keyword::Enabled => Statement::Enabled(self.optional_truthy()),
            Keyword::Selected => Statement::Selected(self.optional_truthy()),
            Keyword::At => Statement::At(self.axis_pair()?),
            Keyword::Size => Statement::Size(self.axis_pair()?),
            Keyword::Check => Statement::Check(self.text()?),
            Keyword::Checksum => Statement::Checksum(self.checksum()?),
            Keyword::Wait => Statement::Wait(self.number()?),
            Keyword::WaitFor => {
                let token = self.expect_value()?;
                if token.text != "navigation" {
                    return Err(Failure::syntax("wait-for expects \"navigation\"", &token));
                }
                Statement::WaitForNavigation
            }
            Keyword::Echo => Statement::Echo(self.text()?),
            Keyword::Set => Statement::Set(self.text()?),
            Keyword::Send => Statement::Send(self.text()?),
            Keyword::Clear => Statement::Clear,
            Keyword::Press => Statement::Press(self.key(false)?),
            Keyword::SendKey => Statement::Press(self.key(true)?),
            Keyword::Push => {
                self.expect_keyword("wait")?;
                Statement::PushWait
            }
            Keyword::Pop => {
                self.expect_keyword("wait")?;
                Statement::PopWait
            }
            Keyword::Exec => self.parse_exec(false)?,
            Keyword::ExecInclude => self.parse_exec(true)?,
            Keyword::If => Statement::If,
            Keyword::Then => Statement::Then,
            Keyword::Endif => Statement::Endif,
            Keyword::Fail => Statement::Fail(self.text()?),
            Keyword::Mouse => Statement::Mouse(self.parse_mouse()?),
            Keyword::While => {
                let open = self.expect_symbol('{')?;
                Statement::While(self.source.capture_block(self.arena, &open, false)?)
            }
            Keyword::ScrollIntoView => Statement::ScrollIntoView,
        };
        Ok(statement)
    }

    fn next(&mut self) -> Token {
        self.source.next_token(self.arena)
    }

    fn peek(&mut self) -> Token {
        self.source.peek_token(self.arena)
    }

    /// Next token, which must not be `End`
    fn expect_any(&mut self) -> ScriptResult<Token> {
        let token = self.next();
        if token.is_end() {
            return Err(Failure::syntax("unexpected end of input", &token));
        }
        Ok(token)
    }

    /// A word or number operand
    fn expect_value(&mut self) -> ScriptResult<Token> {
        let token = self.expect_any()?;
        match token.kind {
            TokenKind::Word | TokenKind::Number => Ok(token),
            _ => Err(Failure::syntax(
                format!("expected string but got {}", token.kind),
                &token,
            )),
        }
    }

    fn text(&mut self) -> ScriptResult<String> {
        Ok(self.expect_value()?.text)
    }

    fn number(&mut self) -> ScriptResult<f64> {
        let token = self.expect_any()?;
        match token.number {
            Some(value) if token.kind == TokenKind::Number => Ok(value),
            _ => Err(Failure::syntax(
                format!("expected number but got {}", token.kind),
                &token,
            )),
        }
    }

    fn dimension(&mut self) -> ScriptResult<u32> {
        let value = self.number()?;
        Ok(value.max(0.0).round() as u32)
    }

    fn expect_symbol(&mut self, symbol: char) -> ScriptResult<Token> {
        let token = self.expect_any()?;
        if token.is_symbol(symbol) {
            Ok(token)
        } else {
            Err(Failure::syntax(format!("expected '{}'", symbol), &token))
        }
    }

    fn expect_keyword(&mut self, word: &str) -> ScriptResult<Token> {
        let token = self.expect_any()?;
        if token.is_keyword(word) {
            Ok(token)
        } else {
            Err(Failure::syntax(format!("expected '{}'", word), &token))
        }
    }

    fn skip_symbol(&mut self, symbol: char) -> bool {
        if self.peek().is_symbol(symbol) {
            self.next();
            true
        } else {
            false
        }
    }

    fn pair(&mut self) -> ScriptResult<(u32, u32)> {
        let a = self.dimension()?;
        self.expect_symbol(',')?;
        let b = self.dimension()?;
        Ok((a, b))
    }

    fn truthy(&mut self) -> ScriptResult<bool> {
        let token = self.expect_value()?;
        parse_truthy(&token.text)
            .ok_or_else(|| Failure::syntax("expected on/off, yes/no or true/false", &token))
    }

    fn optional_truthy(&mut self) -> bool {
        let token = self.peek();
        if token.kind != TokenKind::Word {
            return true;
        }
        match parse_truthy(&token.text) {
            Some(value) => {
                self.next();
                value
            }
            None => true,
        }
    }

    fn parse_default(&mut self) -> ScriptResult<Statement> {
        let token = self.expect_any()?;
        match token.text.as_str() {
            "wait" => Ok(Statement::DefaultWait(self.number()?)),
            "screenshot" => Ok(Statement::DefaultScreenshot(self.text()?)),
            _ => Err(Failure::syntax("expected 'wait' or 'screenshot'", &token)),
        }
    }

    fn parse_browser(&mut self) -> ScriptResult<BrowserCommand> {
        let token = self.expect_any()?;
        let command = match token.text.as_str() {
            "start" => BrowserCommand::Start,
            "connect" => BrowserCommand::Connect(self.text()?),
            "size" => {
                let (w, h) = self.pair()?;
                BrowserCommand::Size(w, h)
            }
            "chrome" => {
                let (x, y) = self.pair()?;
                BrowserCommand::Chrome(x, y)
            }
            "get" => BrowserCommand::Get(self.text()?),
            "close" => BrowserCommand::Close,
            "wait" => BrowserCommand::Wait(self.number()?),
            "back" => BrowserCommand::Back,
            "forward" => BrowserCommand::Forward,
            "refresh" => BrowserCommand::Refresh,
            "send" => BrowserCommand::Send(self.text()?),
            "headless" => BrowserCommand::Headless(self.truthy()?),
            "option" => BrowserCommand::Option(self.text()?),
            "prefs" => {
                let pref = self.text()?;
                BrowserCommand::Prefs(pref, self.text()?)
            }
            _ => return Err(Failure::syntax("unknown browser command", &token)),
        };
        Ok(command)
    }

    fn parse_log(&mut self) -> ScriptResult<Statement> {
        let token = self.expect_any()?;
        match token.text.as_str() {
            "auto" => Ok(Statement::LogAuto(self.truthy()?)),
            "dump" => Ok(Statement::LogDump),
            _ => Err(Failure::syntax("expected 'auto' or 'dump'", &token)),
        }
    }

    fn json_value(token: &Token) -> serde_json::Value {
        match token.number {
            Some(n) if token.kind == TokenKind::Number => serde_json::json!(n),
            _ => serde_json::Value::String(token.text.clone()),
        }
    }

    fn parse_call(&mut self) -> ScriptResult<Statement> {
        let name = self.text()?;
        let mut args = Vec::new();
        if self.skip_symbol('{') {
            loop {
                let token = self.expect_any()?;
                if token.is_symbol('}') {
                    break;
                }
                if token.is_symbol(',') {
                    continue;
                }
                match token.kind {
                    TokenKind::Word | TokenKind::Number => args.push(Self::json_value(&token)),
                    _ => return Err(Failure::syntax("unexpected symbol in call arguments", &token)),
                }
            }
        }
        Ok(Statement::Call { name, args })
    }

    fn parse_alias(&mut self) -> ScriptResult<Alias> {
        let name_token = self.expect_any()?;
        if name_token.kind != TokenKind::Word {
            return Err(Failure::syntax("expected alias name", &name_token));
        }

        let mut params = Vec::new();
        let mut open = self.expect_any()?;
        if open.is_symbol('(') {
            loop {
                let token = self.expect_any()?;
                if token.is_symbol(')') {
                    break;
                }
                if token.is_symbol(',') {
                    continue;
                }
                if token.kind != TokenKind::Word {
                    return Err(Failure::syntax("expected parameter name", &token));
                }
                params.push(token.text.trim_start_matches('$').to_string());
            }
            open = self.expect_any()?;
        }
        if !open.is_symbol('{') {
            return Err(Failure::syntax("expected '{'", &open));
        }

        let block = self.source.capture_block(self.arena, &open, true)?;
        Ok(Alias {
            name: name_token.text,
            params,
            body: block.span,
        })
    }

    fn parse_invocation(&mut self, first: &Token) -> ScriptResult<Statement> {
        let Some(alias) = self.aliases.get(&first.text) else {
            return Err(Failure::syntax("unexpected token", first));
        };
        let params = alias.params.clone();

        let mut bindings: Bindings = HashMap::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.skip_symbol(',');
            }
            let token = self.expect_any()?;
            bindings.insert(param.clone(), token);
        }
        Ok(Statement::Invoke {
            name: first.text.clone(),
            bindings,
        })
    }

    fn axis(&mut self) -> ScriptResult<Axis> {
        let token = self.expect_any()?;
        if token.is_symbol('*') || (token.kind == TokenKind::Word && token.text == "*") {
            return Ok(Axis::Any);
        }
        let Some(lo) = token.number.filter(|_| token.kind == TokenKind::Number) else {
            return Err(Failure::syntax("expected number, '*' or lo:hi", &token));
        };
        if self.skip_symbol(':') {
            let hi = self.number()?;
            Ok(Axis::Range(lo, hi))
        } else {
            Ok(Axis::Exact(lo))
        }
    }

    fn axis_pair(&mut self) -> ScriptResult<AxisPair> {
        let a = self.axis()?;
        self.expect_symbol(',')?;
        let b = self.axis()?;
        Ok(AxisPair(a, b))
    }

    fn checksum(&mut self) -> ScriptResult<u32> {
        let token = self.expect_value()?;
        let digits = match (token.kind, token.text.split_once(':')) {
            (TokenKind::Number, _) => token.text.as_str(),
            (_, Some(("crc32", digits))) => digits,
            _ => return Err(Failure::syntax("expected \"crc32:<number>\"", &token)),
        };
        digits
            .trim()
            .parse::<u32>()
            .map_err(|_| Failure::syntax("invalid crc32 value", &token))
    }

    fn key(&mut self, allow_code: bool) -> ScriptResult<Key> {
        let token = self.expect_value()?;
        if allow_code && token.kind == TokenKind::Number {
            return token
                .number
                .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
                .map(|n| Key::Code(n as u32))
                .ok_or_else(|| Failure::syntax("invalid key code", &token));
        }
        Key::from_name(&token.text).ok_or_else(|| Failure::syntax("unknown key", &token))
    }

    fn parse_exec(&mut self, include: bool) -> ScriptResult<Statement> {
        let command = self.text()?;
        let mut args = Vec::new();
        if self.skip_symbol('(') {
            loop {
                let token = self.expect_any()?;
                if token.is_symbol(')') {
                    break;
                }
                if token.is_symbol(',') {
                    continue;
                }
                match token.kind {
                    TokenKind::Word | TokenKind::Number => args.push(token.text),
                    _ => return Err(Failure::syntax("unexpected symbol in exec arguments", &token)),
                }
            }
        }
        Ok(Statement::Exec {
            command,
            args,
            include,
        })
    }

    fn parse_offset(token: &Token) -> Option<MouseStep> {
        let (dx, dy) = token.text.split_once(',')?;
        Some(MouseStep::Move {
            dx: dx.trim().parse().ok()?,
            dy: dy.trim().parse().ok()?,
        })
    }

    fn parse_mouse(&mut self) -> ScriptResult<Vec<MouseStep>> {
        self.expect_symbol('{')?;
        let mut steps = Vec::new();
        loop {
            let token = self.expect_any()?;
            if token.is_symbol('}') {
                break;
            }
            let step = match token.kind {
                TokenKind::Number => {
                    let dx = token.number.unwrap_or_default();
                    self.expect_symbol(',')?;
                    let dy = self.number()?;
                    MouseStep::Move { dx, dy }
                }
                TokenKind::Word if token.is_quoted() => Self::parse_offset(&token)
                    .ok_or_else(|| Failure::syntax("expected \"dx,dy\"", &token))?,
                TokenKind::Word => match token.text.as_str() {
                    "body" => MouseStep::Body,
                    "origin" => MouseStep::Origin,
                    "center" => MouseStep::Center,
                    "click" => MouseStep::Click,
                    "down" => MouseStep::Down,
                    "up" => MouseStep::Up,
                    "sleep" => MouseStep::Sleep(self.number()?),
                    _ => return Err(Failure::syntax("unknown mouse step", &token)),
                },
                _ => return Err(Failure::syntax("unexpected symbol in mouse block", &token)),
            };
            steps.push(step);
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LexerConfig;
    use crate::source::ScannerSource;
    use test_case::test_case;

    fn parse_all(text: &str, aliases: &AliasTable) -> ScriptResult<Vec<Statement>> {
        let mut arena = TokenArena::new();
        let mut source = ScannerSource::new(text, &LexerConfig::default());
        let mut statements = Vec::new();
        loop {
            let first = source.next_token(&arena);
            if first.is_end() {
                return Ok(statements);
            }
            let mut parser = StatementParser::new(&mut source, &mut arena, aliases);
            statements.push(parser.parse(&first)?);
        }
    }

    fn parse_one(text: &str) -> Statement {
        let mut statements = parse_all(text, &AliasTable::new()).unwrap();
        assert_eq!(statements.len(), 1, "{}", text);
        statements.remove(0)
    }

    #[test]
    fn test_keyword_table_round_trips() {
        for (name, keyword) in KEYWORDS {
            assert_eq!(Keyword::lookup(name), Some(*keyword));
        }
        assert_eq!(Keyword::lookup("function"), Some(Keyword::Alias));
        assert_eq!(Keyword::Alias.as_str(), "alias");
        assert_eq!(Keyword::lookup("bogus"), None);
    }

    #[test_case("on", Some(true))]
    #[test_case("YES", Some(true))]
    #[test_case("true", Some(true))]
    #[test_case("off", Some(false))]
    #[test_case("No", Some(false))]
    #[test_case("false", Some(false))]
    #[test_case("maybe", None)]
    fn test_truthy(word: &str, expected: Option<bool>) {
        assert_eq!(parse_truthy(word), expected);
    }

    #[test]
    fn test_geometry_operands() {
        match parse_one("at *,10:20") {
            Statement::At(AxisPair(Axis::Any, Axis::Range(lo, hi))) => {
                assert_eq!((lo, hi), (10.0, 20.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_one("size 100, -5") {
            Statement::Size(AxisPair(Axis::Exact(w), Axis::Exact(h))) => {
                assert_eq!((w, h), (100.0, -5.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_browser_commands() {
        assert!(matches!(
            parse_one("browser size 800,600"),
            Statement::Browser(BrowserCommand::Size(800, 600))
        ));
        assert!(matches!(
            parse_one("browser headless on"),
            Statement::Browser(BrowserCommand::Headless(true))
        ));
        assert!(matches!(
            parse_one("browser get \"http://localhost/\""),
            Statement::Browser(BrowserCommand::Get(url)) if url == "http://localhost/"
        ));
    }

    #[test]
    fn test_optional_truthy_does_not_eat_then() {
        let statements = parse_all("if selected then displayed no endif", &AliasTable::new()).unwrap();
        assert!(matches!(statements[1], Statement::Selected(true)));
        assert!(matches!(statements[2], Statement::Then));
        assert!(matches!(statements[3], Statement::Displayed(false)));
        assert!(matches!(statements[4], Statement::Endif));
    }

    #[test]
    fn test_alias_definition() {
        match parse_one("function login($user, pass) {\n  field \"user\" set $user\n}") {
            Statement::DefineAlias(alias) => {
                assert_eq!(alias.name, "login");
                assert_eq!(alias.params, vec!["user", "pass"]);
                assert_eq!(alias.body.len(), 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invocation_binds_arguments() {
        let mut aliases = AliasTable::new();
        aliases.define(Alias {
            name: "greet".into(),
            params: vec!["name".into(), "times".into()],
            body: Default::default(),
        });
        let statements = parse_all("greet \"Bob\", 3", &aliases).unwrap();
        match &statements[0] {
            Statement::Invoke { name, bindings } => {
                assert_eq!(name, "greet");
                assert_eq!(bindings["name"].text, "Bob");
                assert_eq!(bindings["times"].number, Some(3.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invocation_missing_argument() {
        let mut aliases = AliasTable::new();
        aliases.define(Alias {
            name: "greet".into(),
            params: vec!["name".into()],
            body: Default::default(),
        });
        let err = parse_all("greet", &aliases).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_unknown_word_is_syntax_error() {
        let err = parse_all("echo \"ok\"\nfrobnicate", &AliasTable::new()).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.token.as_deref(), Some("frobnicate"));
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_type_mismatch() {
        let err = parse_all("sleep \"soon\"", &AliasTable::new()).unwrap_err();
        assert!(err.to_string().contains("expected number but got string"));
    }

    #[test]
    fn test_mouse_block() {
        match parse_one("mouse { center \"10,-5\" down 20,0 up sleep 0.5 }") {
            Statement::Mouse(steps) => assert_eq!(
                steps,
                vec![
                    MouseStep::Center,
                    MouseStep::Move { dx: 10.0, dy: -5.0 },
                    MouseStep::Down,
                    MouseStep::Move { dx: 20.0, dy: 0.0 },
                    MouseStep::Up,
                    MouseStep::Sleep(0.5),
                ]
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exec_and_call_arguments() {
        match parse_one("exec-include \"gen.sh\" (\"a\", 2)") {
            Statement::Exec { command, args, include } => {
                assert_eq!(command, "gen.sh");
                assert_eq!(args, vec!["a", "2"]);
                assert!(include);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_one("call \"setUser\" { \"ann\", 7 }") {
            Statement::Call { name, args } => {
                assert_eq!(name, "setUser");
                assert_eq!(args, vec![serde_json::json!("ann"), serde_json::json!(7.0)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_checksum_and_keys() {
        assert!(matches!(parse_one("checksum \"crc32:12345\""), Statement::Checksum(12345)));
        assert!(matches!(parse_one("sendkey 13"), Statement::Press(Key::Code(13))));
        assert!(matches!(parse_one("sendkey Enter"), Statement::Press(Key::Enter)));
        assert!(parse_all("press 13x", &AliasTable::new()).is_err());
    }
}
