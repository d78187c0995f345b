// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path data and transform attribute grammars, built with nom
//!
//! `parse_path` resolves the full SVG `d` grammar (relative commands,
//! implicit repetition, smooth shorthands) into absolute segments, so
//! downstream code only ever sees MoveTo/LineTo/CubicTo/QuadTo/ArcTo/
//! Close.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::geom::{Affine, Point2};

/// Absolute, resolved path segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point2),
    LineTo(Point2),
    /// Cubic Bézier: two control points and the end point
    CubicTo(Point2, Point2, Point2),
    /// Quadratic Bézier: control point and the end point
    QuadTo(Point2, Point2),
    /// Elliptical arc, endpoint parameterization
    ArcTo {
        rx: f64,
        ry: f64,
        x_rotation: f64,
        large_arc: bool,
        sweep: bool,
        to: Point2,
    },
    Close,
}

/// Recognize a float: `12`, `-.5`, `1.5e-10`, `+3.`
fn float_str(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), digit0))))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

/// Parse a float via fast-float
fn number(input: &str) -> IResult<&str, f64> {
    map_res(float_str, |s: &str| fast_float::parse::<f64, _>(s))(input)
}

/// Skip whitespace and commas between numbers
fn sep(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace() || c == ','), |_| ())(input)
}

/// Arc flag: a bare `0` or `1`, possibly unseparated from the next number
fn flag(input: &str) -> IResult<&str, bool> {
    map(one_of("01"), |c| c == '1')(input)
}

/// Stateful scanner over one `d` attribute
struct PathScanner<'a> {
    rest: &'a str,
}

impl<'a> PathScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn skip_sep(&mut self) {
        if let Ok((rest, ())) = sep(self.rest) {
            self.rest = rest;
        }
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_sep();
        let (rest, value) =
            number(self.rest).map_err(|_| Error::parse(format!("expected number at '{}'", trim_ctx(self.rest))))?;
        self.rest = rest;
        Ok(value)
    }

    fn flag(&mut self) -> Result<bool> {
        self.skip_sep();
        let (rest, value) =
            flag(self.rest).map_err(|_| Error::parse(format!("expected arc flag at '{}'", trim_ctx(self.rest))))?;
        self.rest = rest;
        Ok(value)
    }

    fn point(&mut self) -> Result<Point2> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Point2::new(x, y))
    }

    fn command(&mut self) -> Option<char> {
        self.skip_sep();
        let c = self.rest.chars().next()?;
        if c.is_ascii_alphabetic() {
            self.rest = &self.rest[1..];
            Some(c)
        } else {
            None
        }
    }

    fn at_number(&mut self) -> bool {
        self.skip_sep();
        matches!(
            self.rest.chars().next(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.'
        )
    }

    fn is_done(&mut self) -> bool {
        self.skip_sep();
        self.rest.is_empty()
    }
}

fn trim_ctx(s: &str) -> &str {
    &s[..s.len().min(24)]
}

/// Parse a `d` attribute into absolute segments
pub fn parse_path(input: &str) -> Result<Vec<PathSegment>> {
    let mut scanner = PathScanner::new(input);
    let mut segments = Vec::new();

    let mut cur = Point2::default();
    let mut subpath_start = Point2::default();
    // reflection state for smooth shorthands
    let mut last_cubic_ctrl: Option<Point2> = None;
    let mut last_quad_ctrl: Option<Point2> = None;
    let mut cmd: Option<char> = None;

    while !scanner.is_done() {
        if let Some(c) = scanner.command() {
            cmd = Some(c);
        } else if !scanner.at_number() {
            return Err(Error::parse(format!(
                "unexpected token at '{}'",
                trim_ctx(scanner.rest)
            )));
        } else if cmd == Some('M') {
            // implicit repetition of a moveto continues as lineto
            cmd = Some('L');
        } else if cmd == Some('m') {
            cmd = Some('l');
        }

        let c = cmd.ok_or_else(|| Error::parse("path data does not start with a command"))?;
        let relative = c.is_ascii_lowercase();
        let rel = |p: Point2, cur: Point2| if relative { cur + p } else { p };

        match c.to_ascii_uppercase() {
            'M' => {
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::MoveTo(p));
                cur = p;
                subpath_start = p;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            'L' => {
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::LineTo(p));
                cur = p;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            'H' => {
                let x = scanner.number()?;
                let p = Point2::new(if relative { cur.x + x } else { x }, cur.y);
                segments.push(PathSegment::LineTo(p));
                cur = p;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            'V' => {
                let y = scanner.number()?;
                let p = Point2::new(cur.x, if relative { cur.y + y } else { y });
                segments.push(PathSegment::LineTo(p));
                cur = p;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            'C' => {
                let c1 = rel(scanner.point()?, cur);
                let c2 = rel(scanner.point()?, cur);
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::CubicTo(c1, c2, p));
                cur = p;
                last_cubic_ctrl = Some(c2);
                last_quad_ctrl = None;
            }
            'S' => {
                // first control point reflects the previous cubic control
                let c1 = match last_cubic_ctrl {
                    Some(prev) => Point2::new(2.0 * cur.x - prev.x, 2.0 * cur.y - prev.y),
                    None => cur,
                };
                let c2 = rel(scanner.point()?, cur);
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::CubicTo(c1, c2, p));
                cur = p;
                last_cubic_ctrl = Some(c2);
                last_quad_ctrl = None;
            }
            'Q' => {
                let c1 = rel(scanner.point()?, cur);
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::QuadTo(c1, p));
                cur = p;
                last_quad_ctrl = Some(c1);
                last_cubic_ctrl = None;
            }
            'T' => {
                let c1 = match last_quad_ctrl {
                    Some(prev) => Point2::new(2.0 * cur.x - prev.x, 2.0 * cur.y - prev.y),
                    None => cur,
                };
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::QuadTo(c1, p));
                cur = p;
                last_quad_ctrl = Some(c1);
                last_cubic_ctrl = None;
            }
            'A' => {
                let rx = scanner.number()?;
                let ry = scanner.number()?;
                let x_rotation = scanner.number()?;
                let large_arc = scanner.flag()?;
                let sweep = scanner.flag()?;
                let p = rel(scanner.point()?, cur);
                segments.push(PathSegment::ArcTo {
                    rx,
                    ry,
                    x_rotation,
                    large_arc,
                    sweep,
                    to: p,
                });
                cur = p;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            'Z' => {
                segments.push(PathSegment::Close);
                cur = subpath_start;
                last_cubic_ctrl = None;
                last_quad_ctrl = None;
            }
            other => {
                return Err(Error::parse(format!("unknown path command '{other}'")));
            }
        }
    }

    Ok(segments)
}

/// Serialize segments back to a `d` attribute (absolute commands only)
pub fn write_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        if !out.is_empty() {
            out.push(' ');
        }
        match seg {
            PathSegment::MoveTo(p) => out.push_str(&format!("M {} {}", fmt(p.x), fmt(p.y))),
            PathSegment::LineTo(p) => out.push_str(&format!("L {} {}", fmt(p.x), fmt(p.y))),
            PathSegment::CubicTo(c1, c2, p) => out.push_str(&format!(
                "C {} {} {} {} {} {}",
                fmt(c1.x),
                fmt(c1.y),
                fmt(c2.x),
                fmt(c2.y),
                fmt(p.x),
                fmt(p.y)
            )),
            PathSegment::QuadTo(c1, p) => out.push_str(&format!(
                "Q {} {} {} {}",
                fmt(c1.x),
                fmt(c1.y),
                fmt(p.x),
                fmt(p.y)
            )),
            PathSegment::ArcTo {
                rx,
                ry,
                x_rotation,
                large_arc,
                sweep,
                to,
            } => out.push_str(&format!(
                "A {} {} {} {} {} {} {}",
                fmt(*rx),
                fmt(*ry),
                fmt(*x_rotation),
                u8::from(*large_arc),
                u8::from(*sweep),
                fmt(to.x),
                fmt(to.y)
            )),
            PathSegment::Close => out.push('Z'),
        }
    }
    out
}

fn fmt(v: f64) -> String {
    // trim trailing zeros so round-tripped documents stay readable
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// transform attribute

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphabetic())(input)
}

fn ws(input: &str) -> IResult<&str, ()> {
    map(take_while(|c: char| c.is_whitespace()), |_| ())(input)
}

fn args(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(
        pair(char('('), sep),
        separated_list1(sep, number),
        pair(sep, char(')')),
    )(input)
}

fn transform_op(input: &str) -> IResult<&str, (&str, Vec<f64>)> {
    pair(preceded(ws, ident), preceded(ws, args))(input)
}

/// Parse a `transform` attribute into a single composed affine
///
/// Operations compose left-to-right as in SVG: `translate(...) scale(...)`
/// scales first in the local frame, then translates.
pub fn parse_transform(input: &str) -> Result<Affine> {
    let mut result = Affine::identity();
    let mut rest = input;

    loop {
        let (r, ()) = take_ws(rest);
        if r.is_empty() {
            break;
        }
        // ops may be separated by commas
        let r = r.strip_prefix(',').unwrap_or(r);
        let (r, (name, values)) = transform_op(r)
            .map_err(|_| Error::parse(format!("bad transform at '{}'", trim_ctx(r))))?;
        let op = transform_from_op(name, &values)?;
        result = result.compose(&op);
        rest = r;
    }

    Ok(result)
}

fn take_ws(input: &str) -> (&str, ()) {
    match ws(input) {
        Ok((rest, ())) => (rest, ()),
        Err(_) => (input, ()),
    }
}

fn transform_from_op(name: &str, values: &[f64]) -> Result<Affine> {
    let wrong_arity = || Error::parse(format!("transform '{name}' has {} args", values.len()));
    match name {
        "matrix" => match values {
            [a, b, c, d, e, f] => Ok(Affine::new(*a, *b, *c, *d, *e, *f)),
            _ => Err(wrong_arity()),
        },
        "translate" => match values {
            [tx] => Ok(Affine::translate(*tx, 0.0)),
            [tx, ty] => Ok(Affine::translate(*tx, *ty)),
            _ => Err(wrong_arity()),
        },
        "scale" => match values {
            [s] => Ok(Affine::scale(*s, *s)),
            [sx, sy] => Ok(Affine::scale(*sx, *sy)),
            _ => Err(wrong_arity()),
        },
        "rotate" => match values {
            [deg] => Ok(Affine::rotate(deg.to_radians())),
            [deg, cx, cy] => {
                let rot = Affine::rotate(deg.to_radians());
                Ok(Affine::translate(*cx, *cy)
                    .compose(&rot)
                    .compose(&Affine::translate(-cx, -cy)))
            }
            _ => Err(wrong_arity()),
        },
        "skewX" => match values {
            [deg] => Ok(Affine::skew_x(deg.to_radians())),
            _ => Err(wrong_arity()),
        },
        "skewY" => match values {
            [deg] => Ok(Affine::skew_y(deg.to_radians())),
            _ => Err(wrong_arity()),
        },
        other => Err(Error::parse(format!("unknown transform op '{other}'"))),
    }
}

/// Serialize an affine back to a transform attribute
pub fn write_transform(trans: &Affine) -> String {
    format!(
        "matrix({},{},{},{},{},{})",
        fmt(trans.a),
        fmt(trans.b),
        fmt(trans.c),
        fmt(trans.d),
        fmt(trans.e),
        fmt(trans.f)
    )
}
