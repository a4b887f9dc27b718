/// An `An+B` position formula for the `:nth-*` pseudo-classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthExpression {
    /// Step (A).
    pub a: i64,
    /// Offset (B).
    pub b: i64,
}

impl NthExpression {
    /// `2n+1`
    #[must_use]
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// `2n`
    #[must_use]
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// A single position.
    #[must_use]
    pub fn index(n: i64) -> Self {
        Self { a: 0, b: n }
    }

    /// `An+B`
    #[must_use]
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    /// Parses `odd`, `even`, an integer, or an `An+B` formula. Whitespace
    /// anywhere in the formula is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let s: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }
        if let Ok(n) = s.parse::<i64>() {
            return Some(Self::index(n));
        }

        let (step, rest) = s.split_once('n')?;
        let a = match step {
            "" | "+" => 1,
            "-" => -1,
            other => other.parse().ok()?,
        };
        let b = if rest.is_empty() {
            0
        } else if rest.starts_with(['+', '-']) {
            rest.parse().ok()?
        } else {
            return None;
        };
        Some(Self::new(a, b))
    }

    /// Returns `true` if 1-based position `n` satisfies the formula.
    #[must_use]
    pub fn matches(&self, n: i64) -> bool {
        if self.a == 0 {
            return n == self.b;
        }
        // Widened so extreme `a` and `b` cannot overflow.
        let diff = i128::from(n) - i128::from(self.b);
        let step = i128::from(self.a);
        let on_side = if step > 0 { diff >= 0 } else { diff <= 0 };
        on_side && diff % step == 0
    }
}
