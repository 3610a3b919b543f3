use serde_json::{Value, json};

use affseed_core::{ErrorSet, EventType, NewAccount, Result};

use super::{GenerationContext, Generated, Generator, Progress, Unit, iterations, to_value, validate};
use crate::options::UserOptions;
use crate::random::Randomizer;

/// Creates accounts with random credentials and names.
#[derive(Debug, Clone)]
pub struct UserGenerator {
    options: UserOptions,
    errors: ErrorSet,
}

impl UserGenerator {
    pub fn new(options: UserOptions) -> Self {
        let mut errors = ErrorSet::new();
        validate::number(&mut errors, "invalid_user_number_arg", "users", options.number);
        Self { options, errors }
    }

    pub fn resolved(&self) -> &UserOptions {
        &self.options
    }
}

impl Generator for UserGenerator {
    type Output = Generated;

    fn name(&self) -> &'static str {
        "user"
    }

    fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    fn options(&self) -> Value {
        to_value(&self.options)
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        let mut generated = Generated::default();
        for index in 0..iterations(self.options.number) {
            let account = NewAccount {
                login: random.username(),
                password: random.password(),
                email: random.email(),
                first_name: random.first_name(),
                last_name: random.last_name(),
            };
            let result = ctx.host.create_account(&account);
            generated.record(Unit::User, index, result, progress);
        }

        ctx.events.log(
            EventType::GeneratorEvent,
            "users_generated",
            format!("The user generator created {} users.", generated.len()),
            self.name(),
            json!({
                "users": generated.ids,
                "skipped": generated.skipped.len(),
                "args": self.options(),
            }),
        );
        Ok(generated)
    }
}
