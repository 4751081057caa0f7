// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Random test results, for exercising the pipeline without a real suite.

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TestCaseResult, TestStatus, ValueStats};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{Collector, Outcome, Tool, ToolError};

pub struct RndTest;

const DEFAULT_COUNT: u64 = 10;

const CITIES: &[&str] = &[
    "Shanghai", "Lagos", "Istanbul", "Karachi", "Mumbai", "Moscow", "Sao Paulo", "Beijing", "Delhi",
    "Seoul", "Jakarta", "Tokyo", "Cairo", "Dhaka", "Mexico", "Kinshasa", "Bangalore", "New York",
    "London", "Bangkok", "Tehran", "Bogota", "Lima", "Hong Kong", "Hanoi", "Rio de Janeiro",
    "Singapore", "Riyadh", "Santiago", "Ankara", "Johannesburg", "Nairobi", "Sydney", "Madrid",
    "Berlin", "Casablanca", "Algiers", "Kabul", "Melbourne", "Cape Town", "Yokohama", "Busan",
];

const ANIMALS: &[&str] = &[
    "Aardvark", "Albatross", "Alligator", "Alpaca", "Ant", "Anteater", "Antelope", "Armadillo",
    "Baboon", "Badger", "Barracuda", "Bat", "Bear", "Beaver", "Bee", "Bison", "Buffalo", "Camel",
    "Caribou", "Cat", "Cheetah", "Chinchilla", "Cobra", "Coyote", "Crab", "Crane", "Crocodile",
    "Crow", "Deer", "Dolphin", "Dove", "Duck", "Eagle", "Eel", "Elephant", "Elk", "Emu", "Falcon",
    "Ferret", "Flamingo", "Fox", "Frog", "Gazelle", "Giant Panda", "Giraffe", "Goat", "Gorilla",
    "Hamster", "Hawk", "Hedgehog", "Heron", "Hippopotamus", "Horse", "Hyena", "Jaguar", "Kangaroo",
    "Koala", "Lemur", "Leopard", "Lion", "Llama", "Lobster", "Magpie", "Meerkat", "Mole", "Moose",
    "Narwhal", "Newt", "Octopus", "Okapi", "Otter", "Owl", "Panther", "Parrot", "Pelican",
    "Penguin", "Rabbit", "Raccoon", "Raven", "Reindeer", "Salmon", "Seal", "Shark", "Sheep",
    "Snail", "Squirrel", "Swan", "Tapir", "Tiger", "Turtle", "Walrus", "Whale", "Wolf", "Wombat",
    "Yak", "Zebra",
];

const VALUE_NAMES: &[&str] = &["FPS", "pressure", "speed", "duration", "temperature"];

#[async_trait]
impl Tool for RndTest {
    fn name(&self) -> &'static str {
        "rndtest"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::CollectTests, Command::RunTests]
    }

    async fn collect_tests(&self, _cx: &Context, step: &Step) -> Result<Vec<String>, ToolError> {
        let count = step.get::<u64>("count")?.unwrap_or(DEFAULT_COUNT);
        Ok(test_names(count as usize))
    }

    async fn run_tests(
        &self,
        _cx: &Context,
        step: &Step,
        out: &mut Collector<'_, TestCaseResult>,
    ) -> Result<Outcome, ToolError> {
        for test in step.tests() {
            tracing::info!(%test, "executing test");
            let result = random_result(&mut StdRng::from_entropy(), test);
            out.report(result).await?;
        }
        Ok(Outcome::ok())
    }
}

/// The same `count` names on every call.
pub(crate) fn test_names(count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..count)
        .map(|_| {
            let animal = ANIMALS.choose(&mut rng).copied().unwrap_or("Cat").replace(' ', "-");
            let city = CITIES.choose(&mut rng).copied().unwrap_or("Lima").replace(' ', "-");
            format!("test_{animal}_{}.from.{city}", rng.gen_range(0..=100_000))
        })
        .collect()
}

pub(crate) fn random_result(rng: &mut impl Rng, test: String) -> TestCaseResult {
    let status = TestStatus::from(rng.gen_range(0..=5u8));
    let mut result = TestCaseResult::new(test.clone(), status).with_cmd(format!("random_test {test}"));

    let count = rng.gen_range(0..=3);
    for name in VALUE_NAMES.choose_multiple(rng, count) {
        let span = *[100u32, 1000, 10000].choose(rng).unwrap_or(&100);
        let size = *[1usize, 10, 50, 100].choose(rng).unwrap_or(&1);
        let samples: Vec<f64> = (0..size).map(|_| f64::from(rng.gen_range(0..span))).collect();
        if let Some(stats) = ValueStats::from_samples(&samples) {
            result = result.with_value(*name, stats);
        }
    }
    result
}

#[cfg(test)]
#[path = "rndtest_tests.rs"]
mod tests;
