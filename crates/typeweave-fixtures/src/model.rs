//! Hand-written host types matching the fixture schemas

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    Mid,
    High,
}

impl Level {
    pub fn code(&self) -> i32 {
        match self {
            Level::Low => 1,
            Level::Mid => 2,
            Level::High => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub email: Option<String>,
    pub tags: Vec<String>,
    pub favorite: Option<Color>,
    pub level: Level,
    score: f64,
}

impl Person {
    pub fn new(name: String) -> Self {
        Self {
            name,
            age: 0,
            email: None,
            tags: Vec::new(),
            favorite: None,
            level: Level::Low,
            score: 0.5,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub note: Option<String>,
}

impl Ticket {
    pub fn new() -> Self {
        Self {
            title: "untitled".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub counts: HashMap<String, i32>,
    pub labels: BTreeMap<i64, String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gauge {
    pub value: i32,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    pub gauges: Vec<Gauge>,
    pub primary: Option<Gauge>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }
}
