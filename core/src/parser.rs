//! Ruleset parser: JCR text to [`RuleTree`].
//!
//! Built from `nom` combinators over [`LocatedSpan`], so every rule node
//! records the line, column and byte offset it starts at.
//!
//! ```text
//! ruleset    = *( directive / named-rule / root-rule )
//! directive  = "#" name [params] EOL
//! named-rule = "$" name "=" [":"] rule
//! rule       = *annotation ( array / object / group / "$" name / member / value )
//! member     = ( q-string / regex ) ":" rule
//! items      = [ item *( ( "," / "|" ) item ) ]     ; one combinator per level
//! item       = rule [ repetition ]
//! repetition = ( "?" / "+" / "*" [ n ] [ ".." [ m ] ] ) [ "%" step ]
//! ```
//!
//! Comments start with `;` and run to the end of the line or the next `;`.

use crate::render::elide;
use crate::repetition::Repetition;
use crate::rule::{
    Annotation, Annotations, Combinator, Definition, Directive, DirectiveKind, Item, MemberDef,
    MemberMatcher, Node, Pattern, Position, Rule, RuleTree, UriTemplate, ValueDef,
};
use crate::JcrError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending, one_of, space0},
    combinator::{cut, map, opt, recognize, value},
    error::{context, ContextError, ErrorKind, ParseError},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult, Slice,
};
use nom_locate::LocatedSpan;
use tracing::debug;

type Span<'a> = LocatedSpan<&'a str>;
type PResult<'a, T> = IResult<Span<'a>, T, SyntaxError<'a>>;

/// Parse ruleset text.
///
/// # Errors
///
/// Returns [`JcrError::Parse`] with the line and column of the first
/// syntax error, or [`JcrError::InvalidPattern`] for a regex that does not
/// compile.
pub fn parse(text: &str) -> Result<RuleTree, JcrError> {
    match ruleset(Span::new(text)) {
        Ok((_, nodes)) => {
            debug!(nodes = nodes.len(), "parsed ruleset");
            Ok(RuleTree::new(nodes))
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_jcr_error()),
        Err(nom::Err::Incomplete(_)) => Err(JcrError::Parse {
            line: 0,
            column: 0,
            message: "incomplete input".into(),
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
enum SyntaxErrorKind {
    Nom(ErrorKind),
    Char(char),
    Message(&'static str),
    Pattern { pattern: String, message: String },
}

/// Parser error that keeps the furthest failure point and its contexts.
#[derive(Debug)]
struct SyntaxError<'a> {
    span: Span<'a>,
    kind: SyntaxErrorKind,
    context: Vec<&'static str>,
}

impl<'a> SyntaxError<'a> {
    fn message(span: Span<'a>, message: &'static str) -> nom::Err<Self> {
        nom::Err::Failure(Self {
            span,
            kind: SyntaxErrorKind::Message(message),
            context: Vec::new(),
        })
    }

    fn into_jcr_error(self) -> JcrError {
        let Position { line, column, .. } = position(&self.span);
        let mut message = match self.kind {
            SyntaxErrorKind::Pattern { pattern, message } => {
                return JcrError::InvalidPattern { pattern, message }
            }
            SyntaxErrorKind::Message(message) => message.to_string(),
            SyntaxErrorKind::Char(c) => format!("expected '{c}'"),
            SyntaxErrorKind::Nom(ErrorKind::Digit) => "expected a number".into(),
            SyntaxErrorKind::Nom(_) => "unexpected input".into(),
        };
        let near = self.span.fragment().lines().next().unwrap_or("").trim();
        if near.is_empty() {
            message.push_str(" at end of line");
        } else {
            message.push_str(&format!(" near \"{}\"", elide(near, 20)));
        }
        for ctx in self.context {
            message.push_str(" in ");
            message.push_str(ctx);
        }
        JcrError::Parse {
            line,
            column,
            message,
        }
    }
}

impl<'a> ParseError<Span<'a>> for SyntaxError<'a> {
    fn from_error_kind(input: Span<'a>, kind: ErrorKind) -> Self {
        Self {
            span: input,
            kind: SyntaxErrorKind::Nom(kind),
            context: Vec::new(),
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn from_char(input: Span<'a>, c: char) -> Self {
        Self {
            span: input,
            kind: SyntaxErrorKind::Char(c),
            context: Vec::new(),
        }
    }

    fn or(self, other: Self) -> Self {
        if other.span.location_offset() >= self.span.location_offset() {
            other
        } else {
            self
        }
    }
}

impl<'a> ContextError<Span<'a>> for SyntaxError<'a> {
    fn add_context(_input: Span<'a>, ctx: &'static str, mut other: Self) -> Self {
        other.context.push(ctx);
        other
    }
}

fn position(span: &Span<'_>) -> Position {
    Position::new(
        span.location_line(),
        u32::try_from(span.get_utf8_column()).unwrap_or(u32::MAX),
        span.location_offset(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Whitespace and comments
// ═══════════════════════════════════════════════════════════════════════════════

fn comment(input: Span<'_>) -> PResult<'_, ()> {
    let (body, _) = char(';')(input)?;
    let text = body.fragment();
    let mut end = text.len();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            ';' => {
                end = i + 1;
                break;
            }
            '\n' | '\r' => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    Ok((body.slice(end..), ()))
}

/// Whitespace and comments, possibly empty.
fn sp(input: Span<'_>) -> PResult<'_, ()> {
    value((), many0_count(alt((value((), multispace1), comment))))(input)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ruleset
// ═══════════════════════════════════════════════════════════════════════════════

fn ruleset(input: Span<'_>) -> PResult<'_, Vec<Node>> {
    let mut nodes = Vec::new();
    let (mut input, ()) = sp(input)?;
    while !input.fragment().is_empty() {
        let (rest, node) = node(input)?;
        nodes.push(node);
        let (rest, ()) = sp(rest)?;
        input = rest;
    }
    Ok((input, nodes))
}

fn node(input: Span<'_>) -> PResult<'_, Node> {
    alt((
        map(directive, Node::Directive),
        map(named_rule, Node::Rule),
        map(root_rule, Node::Rule),
    ))(input)
}

fn rule_name(input: Span<'_>) -> PResult<'_, String> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic()),
            take_while(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')),
        )),
        |name: Span<'_>| name.fragment().to_string(),
    )(input)
}

#[tracing::instrument(level = "debug", skip(input))]
fn named_rule(input: Span<'_>) -> PResult<'_, Rule> {
    let start = position(&input);
    let (input, leading) = many0(terminated(annotation, sp))(input)?;
    let (input, name) = terminated(
        preceded(char('$'), rule_name),
        tuple((sp, char('='), sp)),
    )(input)?;
    let body = input;
    let (input, value_only) = opt(terminated(char(':'), sp))(input)?;
    let (input, mut rule) = cut(context("rule definition", rule))(input)?;
    if value_only.is_some()
        && !matches!(rule.definition, Definition::Value(_) | Definition::Group(_))
    {
        return Err(SyntaxError::message(
            body,
            "'=:' must be followed by a value rule",
        ));
    }
    rule.name = Some(name);
    rule.annotations.extend(Annotations::new(leading));
    rule.position = start;
    Ok((input, rule))
}

#[tracing::instrument(level = "debug", skip(input))]
fn root_rule(input: Span<'_>) -> PResult<'_, Rule> {
    let (rest, rule) = context("root rule", rule)(input)?;
    if rule.is_member() {
        return Err(SyntaxError::message(input, "a member rule cannot be a root"));
    }
    Ok((rest, rule))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Directives
// ═══════════════════════════════════════════════════════════════════════════════

#[tracing::instrument(level = "debug", skip(input))]
fn directive(input: Span<'_>) -> PResult<'_, Directive> {
    let start = position(&input);
    let (rest, line) = preceded(pair(char('#'), space0), not_line_ending)(input)?;
    let text = line.fragment().split(';').next().unwrap_or("").trim();
    let mut words = text.split_whitespace();
    let name = words.next().unwrap_or("");
    let kind = match name {
        "jcr-version" => {
            let version = words
                .next()
                .and_then(|v| v.split_once('.'))
                .and_then(|(major, minor)| Some((major.parse().ok()?, minor.parse().ok()?)));
            let Some((major, minor)) = version else {
                return Err(SyntaxError::message(line, "jcr-version needs major.minor"));
            };
            let extensions = words
                .map(|w| w.trim_start_matches('+'))
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
            DirectiveKind::JcrVersion {
                major,
                minor,
                extensions,
            }
        }
        "ruleset-id" => match words.next() {
            Some(id) => DirectiveKind::RulesetId(id.to_string()),
            None => return Err(SyntaxError::message(line, "ruleset-id needs an identifier")),
        },
        "import" => {
            let Some(uri) = words.next() else {
                return Err(SyntaxError::message(line, "import needs a URI"));
            };
            let alias = match (words.next(), words.next()) {
                (None, _) => None,
                (Some("as"), Some(alias)) => Some(alias.to_string()),
                _ => return Err(SyntaxError::message(line, "expected 'as alias' after import URI")),
            };
            DirectiveKind::Import {
                uri: uri.to_string(),
                alias,
            }
        }
        "" => return Err(SyntaxError::message(line, "empty directive")),
        _ => {
            let params = text[name.len()..].trim();
            DirectiveKind::Unknown {
                name: name.to_string(),
                params: (!params.is_empty()).then(|| params.to_string()),
            }
        }
    };
    Ok((
        rest,
        Directive {
            kind,
            position: start,
        },
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════════════════════════════════════════

fn rule(input: Span<'_>) -> PResult<'_, Rule> {
    let start = position(&input);
    let (input, annotations) = many0(terminated(annotation, sp))(input)?;
    let (input, definition) = definition(input)?;
    Ok((
        input,
        Rule {
            name: None,
            annotations: Annotations::new(annotations),
            definition,
            position: start,
        },
    ))
}

fn annotation(input: Span<'_>) -> PResult<'_, Annotation> {
    let body = tuple((
        preceded(
            space0,
            take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')),
        ),
        take_while(|c| c != '}'),
    ));
    let (rest, (name, params)) =
        context("annotation", preceded(tag("@{"), cut(terminated(body, char('}')))))(input)?;
    let params = params.fragment().trim();
    let annotation = match (*name.fragment(), params.is_empty()) {
        ("not", true) => Annotation::Not,
        ("unordered", true) => Annotation::Unordered,
        ("root", true) => Annotation::Root,
        (name, _) => Annotation::Unknown {
            name: name.to_string(),
            params: (!params.is_empty()).then(|| params.to_string()),
        },
    };
    Ok((rest, annotation))
}

fn definition(input: Span<'_>) -> PResult<'_, Definition> {
    alt((
        map(container('[', ']', "array"), Definition::Array),
        map(container('{', '}', "object"), Definition::Object),
        map(container('(', ')', "group"), Definition::Group),
        map(preceded(char('$'), rule_name), Definition::TargetReference),
        member_or_literal,
        map(value_def, Definition::Value),
    ))(input)
}

fn container<'a>(
    open: char,
    close: char,
    what: &'static str,
) -> impl FnMut(Span<'a>) -> PResult<'a, Vec<Item>> {
    context(
        what,
        preceded(
            char(open),
            cut(terminated(preceded(sp, items), preceded(sp, char(close)))),
        ),
    )
}

fn items(input: Span<'_>) -> PResult<'_, Vec<Item>> {
    let (mut input, first) = opt(item)(input)?;
    let Some(first) = first else {
        return Ok((input, Vec::new()));
    };
    let mut items = vec![first];
    let mut seen: Option<Combinator> = None;
    loop {
        let (at, ()) = sp(input)?;
        let (rest, combinator) = opt(alt((
            value(Combinator::Sequence, char(',')),
            value(Combinator::Choice, char('|')),
        )))(at)?;
        let Some(combinator) = combinator else {
            break;
        };
        if seen.is_some_and(|seen| seen != combinator) {
            return Err(SyntaxError::message(
                at,
                "cannot mix ',' and '|' at one level without a group",
            ));
        }
        seen = Some(combinator);
        let (rest, item) = cut(preceded(sp, item))(rest)?;
        items.push(item.joined(combinator));
        input = rest;
    }
    Ok((input, items))
}

fn item(input: Span<'_>) -> PResult<'_, Item> {
    let (input, rule) = rule(input)?;
    let (input, repetition) = opt(preceded(sp, repetition))(input)?;
    Ok((
        input,
        Item {
            combinator: None,
            rule,
            repetition,
        },
    ))
}

fn repetition(input: Span<'_>) -> PResult<'_, Repetition> {
    let start = input;
    let (input, base) = context(
        "repetition",
        alt((
            value(Repetition::OPTIONAL, char('?')),
            value(Repetition::ONE_OR_MORE, char('+')),
            preceded(char('*'), bounds),
        )),
    )(input)?;
    if base.max.is_some_and(|max| max < base.min) {
        return Err(SyntaxError::message(start, "repetition minimum exceeds maximum"));
    }
    let (input, step) = opt(preceded(char('%'), digit1))(input)?;
    match step {
        None => Ok((input, base)),
        Some(step) => match step.fragment().parse::<u32>() {
            Ok(step) if step > 0 => Ok((input, base.with_step(step))),
            _ => Err(SyntaxError::message(step, "repetition step must be a positive integer")),
        },
    }
}

fn bounds(input: Span<'_>) -> PResult<'_, Repetition> {
    let start = input;
    let (input, (min, tail)) = pair(opt(digit1), opt(preceded(tag(".."), opt(digit1))))(input)?;
    let min = count(min, start)?;
    let repetition = match tail {
        None => min.map_or(Repetition::ZERO_OR_MORE, Repetition::exactly),
        Some(max) => Repetition::new(min.unwrap_or(0), count(max, start)?),
    };
    Ok((input, repetition))
}

fn count<'a>(digits: Option<Span<'a>>, at: Span<'a>) -> Result<Option<u32>, nom::Err<SyntaxError<'a>>> {
    digits
        .map(|d| d.fragment().parse::<u32>())
        .transpose()
        .map_err(|_| SyntaxError::message(at, "repetition count out of range"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Members and literals
// ═══════════════════════════════════════════════════════════════════════════════

fn member_or_literal(input: Span<'_>) -> PResult<'_, Definition> {
    let (rest, matcher) = alt((
        map(q_string, MemberMatcher::Name),
        map(regex, MemberMatcher::Regex),
    ))(input)?;
    let (after, colon) = opt(preceded(sp, char(':')))(rest)?;
    if colon.is_none() {
        let value = match matcher {
            MemberMatcher::Name(s) => ValueDef::StringLiteral(s),
            MemberMatcher::Regex(p) => ValueDef::Regex(p),
        };
        return Ok((rest, Definition::Value(value)));
    }
    let (after, target) = cut(context("member", preceded(sp, rule)))(after)?;
    Ok((
        after,
        Definition::Member(MemberDef {
            matcher,
            target: Box::new(target),
        }),
    ))
}

fn q_string(input: Span<'_>) -> PResult<'_, String> {
    let (body, _) = char('"')(input)?;
    let text = body.fragment();
    let mut out = String::new();
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((body.slice(i + 1..), out)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 'b')) => out.push('\u{8}'),
                Some((_, 'f')) => out.push('\u{c}'),
                Some((j, 'u')) => {
                    let decoded = text
                        .get(j + 1..j + 5)
                        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                        .and_then(char::from_u32);
                    let Some(decoded) = decoded else {
                        return Err(SyntaxError::message(body.slice(j..), "invalid \\u escape"));
                    };
                    out.push(decoded);
                    chars.nth(3);
                }
                Some((_, other)) => out.push(other),
                None => break,
            },
            '\n' | '\r' => break,
            _ => out.push(c),
        }
    }
    Err(SyntaxError::message(input, "unterminated string"))
}

fn regex(input: Span<'_>) -> PResult<'_, Pattern> {
    let (body, _) = char('/')(input)?;
    let text = body.fragment();
    let mut source = String::new();
    let mut end = None;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '/' => {
                end = Some(i);
                break;
            }
            '\\' => match chars.next() {
                Some((_, '/')) => source.push('/'),
                Some((_, next)) => {
                    source.push('\\');
                    source.push(next);
                }
                None => break,
            },
            '\n' | '\r' => break,
            _ => source.push(c),
        }
    }
    let Some(end) = end else {
        return Err(SyntaxError::message(input, "unterminated regular expression"));
    };
    let (rest, flags) = take_while(|c: char| matches!(c, 'i' | 's' | 'x'))(body.slice(end + 1..))?;
    match Pattern::new(&source, flags.fragment()) {
        Ok(pattern) => Ok((rest, pattern)),
        Err(e) => Err(nom::Err::Failure(SyntaxError {
            span: input,
            kind: SyntaxErrorKind::Pattern {
                pattern: source,
                message: e.to_string(),
            },
            context: Vec::new(),
        })),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Values
// ═══════════════════════════════════════════════════════════════════════════════

fn value_def(input: Span<'_>) -> PResult<'_, ValueDef> {
    context("value", alt((number_or_range, enumeration, keyword)))(input)
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => n as f64,
            Self::Float(f) => f,
        }
    }
}

fn number(input: Span<'_>) -> PResult<'_, Number> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let text = *text.fragment();
    let parsed = if text.contains(['.', 'e', 'E']) {
        text.parse().ok().map(Number::Float)
    } else {
        text.parse().ok().map(Number::Int)
    };
    match parsed {
        Some(number) => Ok((rest, number)),
        None => Err(SyntaxError::message(input, "number out of range")),
    }
}

fn number_or_range(input: Span<'_>) -> PResult<'_, ValueDef> {
    alt((
        map(preceded(tag(".."), number), |max| range(None, Some(max))),
        map(
            pair(number, opt(preceded(tag(".."), opt(number)))),
            |(min, tail)| match tail {
                None => match min {
                    Number::Int(n) => ValueDef::IntegerLiteral(n),
                    Number::Float(f) => ValueDef::FloatLiteral(f),
                },
                Some(max) => range(Some(min), max),
            },
        ),
    ))(input)
}

fn range(min: Option<Number>, max: Option<Number>) -> ValueDef {
    let int = |n: Option<Number>| match n {
        Some(Number::Int(n)) => Some(n),
        _ => None,
    };
    if matches!(min, Some(Number::Float(_))) || matches!(max, Some(Number::Float(_))) {
        ValueDef::FloatRange {
            min: min.map(Number::as_f64),
            max: max.map(Number::as_f64),
        }
    } else {
        ValueDef::IntegerRange {
            min: int(min),
            max: int(max),
        }
    }
}

fn enumeration(input: Span<'_>) -> PResult<'_, ValueDef> {
    map(
        delimited(
            char('<'),
            cut(many0(preceded(
                sp,
                alt((map(q_string, ValueDef::StringLiteral), number_or_range, keyword)),
            ))),
            cut(preceded(sp, char('>'))),
        ),
        ValueDef::Enumeration,
    )(input)
}

fn keyword(input: Span<'_>) -> PResult<'_, ValueDef> {
    let (rest, word) =
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-')(input)?;
    let word = *word.fragment();
    if word == "uri" {
        if let Ok((after, _)) = tag::<_, _, SyntaxError<'_>>("..")(rest) {
            return uri_range(after);
        }
    }
    let def = match word {
        "any" => ValueDef::Any,
        "null" => ValueDef::Null,
        "boolean" => ValueDef::Boolean,
        "true" => ValueDef::True,
        "false" => ValueDef::False,
        "string" => ValueDef::String,
        "integer" => ValueDef::Integer,
        "float" => ValueDef::Float,
        "double" => ValueDef::Double,
        "ipv4" | "ip4" => ValueDef::Ipv4,
        "ipv6" | "ip6" => ValueDef::Ipv6,
        "ipaddr" => ValueDef::IpAddr,
        "fqdn" => ValueDef::Fqdn,
        "idn" => ValueDef::Idn,
        "uri" => ValueDef::Uri,
        "email" => ValueDef::Email,
        "phone" => ValueDef::Phone,
        "hex" => ValueDef::Hex,
        "base32" => ValueDef::Base32,
        "base32hex" => ValueDef::Base32Hex,
        "base64" => ValueDef::Base64,
        "base64url" => ValueDef::Base64Url,
        "datetime" | "date-time" => ValueDef::DateTime,
        "date" | "full-date" => ValueDef::Date,
        "time" | "full-time" => ValueDef::Time,
        sized => match sized_integer(sized) {
            Some(def) => def,
            None => return Err(SyntaxError::message(input, "unknown value type")),
        },
    };
    Ok((rest, def))
}

/// After `uri..`: a bare scheme, or a template when the scheme is followed by `:`.
fn uri_range(input: Span<'_>) -> PResult<'_, ValueDef> {
    let scheme_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '{' | '}');
    let (rest, scheme) = take_while1(scheme_char)(input)?;
    if !rest.fragment().starts_with(':') {
        if scheme.fragment().contains(['{', '}']) {
            return Err(SyntaxError::message(input, "expected a URI scheme or template"));
        }
        return Ok((rest, ValueDef::UriScheme(scheme.fragment().to_string())));
    }
    let (rest, text) = uri_template_text(input)?;
    match UriTemplate::new(text.fragment()) {
        Ok(template) => Ok((rest, ValueDef::UriTemplate(template))),
        Err(message) => Err(SyntaxError::message(input, message)),
    }
}

/// Non-space text, ending early at a delimiter outside `{...}`.
fn uri_template_text(input: Span<'_>) -> PResult<'_, Span<'_>> {
    let mut depth = 0usize;
    let end = input
        .fragment()
        .char_indices()
        .find(|&(_, c)| match c {
            '{' => {
                depth += 1;
                false
            }
            '}' if depth > 0 => {
                depth -= 1;
                false
            }
            c if c.is_whitespace() => true,
            ',' | ']' | ')' | '}' | ';' | '|' => depth == 0,
            _ => false,
        })
        .map_or(input.fragment().len(), |(at, _)| at);
    Ok((input.slice(end..), input.slice(..end)))
}

fn sized_integer(word: &str) -> Option<ValueDef> {
    let (signed, bits) = match word.strip_prefix("uint") {
        Some(bits) => (false, bits),
        None => (true, word.strip_prefix("int")?),
    };
    match bits {
        "8" | "16" | "32" | "64" => Some(ValueDef::SizedInteger {
            bits: bits.parse().ok()?,
            signed,
        }),
        _ => None,
    }
}
