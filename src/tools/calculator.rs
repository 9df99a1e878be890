//! 计算器工具
//!
//! 只接受数字、`+ - * / % ( . )` 与空格；`**` 为乘方，`//` 为向下取整除。
//! 递归下降求值，不执行任何动态代码。表达式长度与嵌套深度都有上限，递归不会耗尽工作线程的栈。

use schemars::JsonSchema;
use serde::Deserialize;

const ALLOWED_CHARS: &str = "0123456789+-*/().% ";

/// 表达式最大字符数
pub const MAX_EXPRESSION_LEN: usize = 1000;

/// 一元运算符与括号的最大嵌套层数
const MAX_DEPTH: usize = 64;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalculatorArgs {
    /// La expresión matemática a calcular.
    pub expression: String,
}

pub fn calculate(args: CalculatorArgs) -> Result<String, String> {
    let expression = args.expression.trim();
    if expression.is_empty() || !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return Err(
            "Expresión no válida. Solo se permiten operaciones matemáticas básicas.".to_string(),
        );
    }
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "Expresión demasiado larga (máximo {MAX_EXPRESSION_LEN} caracteres)."
        ));
    }
    let value = evaluate(expression).map_err(|e| format!("Error al calcular: {e}"))?;
    Ok(format!("El resultado de {expression} es: {}", format_number(value)))
}

/// 求值整个表达式
pub fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("token inesperado en la posición {}", parser.pos));
    }
    if !value.is_finite() {
        return Err("resultado no finito".to_string());
    }
    Ok(value)
}

/// 整数结果不带小数部分（2+2 -> 4，7/2 -> 3.5）
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => {
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| format!("número inválido '{literal}'"))?;
                tokens.push(Token::Num(n));
            }
            '*' | '/' => {
                let doubled = chars.get(i + 1) == Some(&c);
                tokens.push(match (c, doubled) {
                    ('*', true) => Token::StarStar,
                    ('*', false) => Token::Star,
                    ('/', true) => Token::SlashSlash,
                    _ => Token::Slash,
                });
                i += if doubled { 2 } else { 1 };
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(format!("carácter no permitido '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, String> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == Token::Plus { acc + rhs } else { acc - rhs };
        }
        Ok(acc)
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<f64, String> {
        let mut acc = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::SlashSlash | Token::Percent)) =
            self.peek()
        {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = match op {
                Token::Star => acc * rhs,
                _ if rhs == 0.0 => return Err("división por cero".to_string()),
                Token::Slash => acc / rhs,
                Token::SlashSlash => (acc / rhs).floor(),
                // 余数符号跟随除数
                _ => {
                    let r = acc % rhs;
                    if r != 0.0 && (r < 0.0) != (rhs < 0.0) {
                        r + rhs
                    } else {
                        r
                    }
                }
            };
        }
        Ok(acc)
    }

    // unary := ('+' | '-') unary | power
    // 括号与乘方的指数都经过这里，深度在此统一计数
    fn unary(&mut self) -> Result<f64, String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expresión demasiado anidada".to_string());
        }
        let value = self.unary_inner();
        self.depth -= 1;
        value
    }

    fn unary_inner(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := atom ('**' unary)?   右结合，-2**2 == -4
    fn power(&mut self) -> Result<f64, String> {
        let base = self.atom()?;
        if self.peek() == Some(Token::StarStar) {
            self.pos += 1;
            let exp = self.unary()?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let v = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(v),
                    _ => Err("falta ')'".to_string()),
                }
            }
            Some(t) => Err(format!("token inesperado {t:?}")),
            None => Err("expresión incompleta".to_string()),
        }
    }
}
