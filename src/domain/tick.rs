//! Quote ticks and the mid-price samples buffered from them.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Unix time in seconds.
    pub timestamp: f64,
    pub bid: f64,
    pub ask: f64,
}

impl Tick {
    /// (bid + ask) / 2
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn to_sample(&self) -> Sample {
        Sample {
            timestamp: self.timestamp,
            value: self.mid(),
        }
    }

    /// False when any field is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite() && self.bid.is_finite() && self.ask.is_finite()
    }

    pub fn quote(&self) -> Quote {
        Quote {
            bid: self.bid,
            ask: self.ask,
        }
    }
}

/// One point of the buffered mid-price stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

/// Latest known bid/ask, retained across failed polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}
