//! In-process Redis stand-in for tests.
//!
//! Runs [`SLIDING_WINDOW_SCRIPT`] statement by statement against an
//! in-memory sorted set, so the script text itself is under test. Only the
//! Lua forms and commands the script uses are understood.

use super::{SLIDING_WINDOW_SCRIPT, StoreError, WindowSnapshot};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Int(i64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    fn as_int(&self) -> Result<i64, String> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Str(s) => s.parse().map_err(|_| format!("not a number: {}", s)),
            Value::List(_) => Err("table used as a number".to_string()),
        }
    }

    fn as_text(&self) -> Result<String, String> {
        match self {
            Value::Int(n) => Ok(n.to_string()),
            Value::Str(s) => Ok(s.clone()),
            Value::List(_) => Err("table used as a string".to_string()),
        }
    }
}

/// One sorted set plus the TTL last set on it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SortedSet {
    members: Vec<(i64, String)>,
    pub ttl_ms: Option<i64>,
}

impl SortedSet {
    pub fn scores(&self) -> Vec<i64> {
        self.members.iter().map(|(score, _)| *score).collect()
    }

    fn sort(&mut self) {
        self.members.sort();
    }
}

/// Lower or upper bound of a `ZREMRANGEBYSCORE` call.
fn parse_bound(raw: &str) -> Result<(i64, bool), String> {
    match raw {
        "-inf" => Ok((i64::MIN, true)),
        "+inf" | "inf" => Ok((i64::MAX, true)),
        _ => match raw.strip_prefix('(') {
            Some(exclusive) => exclusive
                .parse()
                .map(|n| (n, false))
                .map_err(|_| format!("bad bound: {}", raw)),
            None => raw
                .parse()
                .map(|n| (n, true))
                .map_err(|_| format!("bad bound: {}", raw)),
        },
    }
}

/// Split a Lua argument list on top-level commas.
fn split_args(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' | '{' if !quoted => depth += 1,
            ')' | '}' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = list[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

struct Frame<'a> {
    locals: HashMap<String, Value>,
    keys: &'a [String],
    argv: &'a [String],
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedRedis {
    sets: Mutex<HashMap<String, SortedSet>>,
}

impl ScriptedRedis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_set(&self, key: &str) -> Option<SortedSet> {
        self.sets.lock().unwrap().get(key).cloned()
    }

    /// `EVAL script numkeys keys... args...`, returning the integer table
    /// the script produces.
    pub fn eval(&self, script: &str, keys: &[String], argv: &[String]) -> Result<Vec<i64>, String> {
        let mut sets = self.sets.lock().unwrap();
        let mut frame = Frame {
            locals: HashMap::new(),
            keys,
            argv,
        };

        for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(rest) = line.strip_prefix("local ") {
                let (name, expr) = rest
                    .split_once('=')
                    .ok_or_else(|| format!("bad assignment: {}", line))?;
                let value = eval_expr(expr.trim(), &frame, &mut sets)?;
                frame.locals.insert(name.trim().to_string(), value);
            } else if let Some(expr) = line.strip_prefix("return ") {
                let table = expr
                    .trim()
                    .strip_prefix('{')
                    .and_then(|t| t.strip_suffix('}'))
                    .ok_or_else(|| format!("expected a table return: {}", line))?;
                return split_args(table)
                    .into_iter()
                    .map(|item| eval_expr(item, &frame, &mut sets)?.as_int())
                    .collect();
            } else {
                eval_expr(line, &frame, &mut sets)?;
            }
        }

        Err("script returned nothing".to_string())
    }

    /// Run the sliding-window script the way the network stores do.
    pub fn record(
        &self,
        key: &str,
        now_ms: i64,
        window_ms: i64,
        member: &str,
    ) -> Result<WindowSnapshot, StoreError> {
        let reply = self
            .eval(
                SLIDING_WINDOW_SCRIPT,
                &[key.to_string()],
                &[now_ms.to_string(), window_ms.to_string(), member.to_string()],
            )
            .map_err(StoreError::Protocol)?;
        WindowSnapshot::from_script_reply(&reply)
    }
}

fn eval_expr(
    expr: &str,
    frame: &Frame<'_>,
    sets: &mut HashMap<String, SortedSet>,
) -> Result<Value, String> {
    if let Some(inner) = expr
        .strip_prefix("redis.call(")
        .and_then(|e| e.strip_suffix(')'))
    {
        let args = split_args(inner)
            .into_iter()
            .map(|arg| eval_expr(arg, frame, sets))
            .collect::<Result<Vec<_>, _>>()?;
        return call(&args, sets);
    }

    if let Some(inner) = expr
        .strip_prefix("tonumber(")
        .and_then(|e| e.strip_suffix(')'))
    {
        return Ok(Value::Int(eval_expr(inner, frame, sets)?.as_int()?));
    }

    if let Some(text) = expr.strip_prefix('\'').and_then(|e| e.strip_suffix('\'')) {
        return Ok(Value::Str(text.to_string()));
    }

    if let Some((left, right)) = expr.split_once(" - ") {
        let left = eval_expr(left.trim(), frame, sets)?.as_int()?;
        let right = eval_expr(right.trim(), frame, sets)?.as_int()?;
        return Ok(Value::Int(left - right));
    }

    if let Some((base, index)) = expr.strip_suffix(']').and_then(|e| e.split_once('[')) {
        let index: usize = index.parse().map_err(|_| format!("bad index: {}", expr))?;
        let slot = index.checked_sub(1).ok_or("Lua indexes start at 1")?;
        let value = match base {
            "KEYS" => frame.keys.get(slot).cloned().map(Value::Str),
            "ARGV" => frame.argv.get(slot).cloned().map(Value::Str),
            local => match frame.locals.get(local) {
                Some(Value::List(items)) => items.get(slot).cloned(),
                _ => return Err(format!("{} is not a table", local)),
            },
        };
        return value.ok_or_else(|| format!("{} is out of range", expr));
    }

    if let Ok(n) = expr.parse::<i64>() {
        return Ok(Value::Int(n));
    }

    frame
        .locals
        .get(expr)
        .cloned()
        .ok_or_else(|| format!("unknown name: {}", expr))
}

fn call(args: &[Value], sets: &mut HashMap<String, SortedSet>) -> Result<Value, String> {
    let (command, args) = args.split_first().ok_or("empty redis.call")?;
    let command = command.as_text()?;
    let key = args
        .first()
        .ok_or_else(|| format!("{} needs a key", command))?
        .as_text()?;
    let arg = |i: usize| {
        args.get(i)
            .ok_or_else(|| format!("{} is missing argument {}", command, i))
    };

    match command.as_str() {
        "ZREMRANGEBYSCORE" => {
            let (min, min_inclusive) = parse_bound(&arg(1)?.as_text()?)?;
            let (max, max_inclusive) = parse_bound(&arg(2)?.as_text()?)?;
            let in_range = |score: i64| {
                (score > min || (min_inclusive && score == min))
                    && (score < max || (max_inclusive && score == max))
            };
            let Some(set) = sets.get_mut(&key) else {
                return Ok(Value::Int(0));
            };
            let before = set.members.len();
            set.members.retain(|(score, _)| !in_range(*score));
            Ok(Value::Int((before - set.members.len()) as i64))
        }
        "ZADD" => {
            let score = arg(1)?.as_int()?;
            let member = arg(2)?.as_text()?;
            let set = sets.entry(key).or_default();
            let added = !set.members.iter().any(|(_, m)| *m == member);
            set.members.retain(|(_, m)| *m != member);
            set.members.push((score, member));
            set.sort();
            Ok(Value::Int(i64::from(added)))
        }
        "PEXPIRE" => {
            let ttl = arg(1)?.as_int()?;
            match sets.get_mut(&key) {
                Some(set) => {
                    set.ttl_ms = Some(ttl);
                    Ok(Value::Int(1))
                }
                None => Ok(Value::Int(0)),
            }
        }
        "ZCARD" => Ok(Value::Int(
            sets.get(&key).map_or(0, |set| set.members.len() as i64),
        )),
        "ZRANGE" => {
            let start = arg(1)?.as_int()?;
            let stop = arg(2)?.as_int()?;
            let with_scores = args.get(3).map(Value::as_text).transpose()?.as_deref() == Some("WITHSCORES");
            let members = sets.get(&key).map(|set| set.members.clone()).unwrap_or_default();
            let len = members.len() as i64;
            let resolve = |i: i64| if i < 0 { len + i } else { i };
            let (start, stop) = (resolve(start).max(0), resolve(stop).min(len - 1));

            let mut out = Vec::new();
            if start <= stop {
                for (score, member) in &members[start as usize..=stop as usize] {
                    out.push(Value::Str(member.clone()));
                    if with_scores {
                        out.push(Value::Str(score.to_string()));
                    }
                }
            }
            Ok(Value::List(out))
        }
        other => Err(format!("unsupported command: {}", other)),
    }
}
