//! Supporting user-defined keybindings.

/// How a single keybinding is written in the config file.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone)]
pub(crate) struct KeybindingConfigRaw {
    /// The modifier keys, like `CTRL`, `SHIFT`, etc.
    pub mods: Option<String>,
    /// The actual key, like a 'x' or `PageUp`.
    pub key: String,
}

/// Everything the user can do to the simulation from the keyboard.
#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub(crate) enum KeybindingAction {
    /// Start when paused, pause when running.
    Toggle,
    /// Start the simulation.
    Start,
    /// Pause the simulation.
    Pause,
    /// Throw away all the particles and create new ones.
    Reset,
    /// Increase the particle count by one. Recreates all the particles.
    MoreParticles,
    /// Decrease the particle count by one. Recreates all the particles.
    FewerParticles,
    /// Increase gravity by one step.
    MoreGravity,
    /// Decrease gravity by one step.
    LessGravity,
    /// Exit Orrery.
    Quit,
}

/// All the keybindings as written in the config.
pub(crate) type KeybindingsRaw = std::collections::HashMap<KeybindingAction, KeybindingConfigRaw>;

/// The keybindings converted to native `termwiz::input::KeyEvent`s.
pub(crate) type KeybindingsAsEvents =
    std::collections::HashMap<KeybindingAction, termwiz::input::KeyEvent>;

impl TryFrom<KeybindingConfigRaw> for termwiz::input::KeyEvent {
    type Error = std::io::Error;

    /// `termwiz::input::KeyEvent` can't be parsed from a string, but it does derive
    /// `serde::Deserialize`, so the key is rewritten into `termwiz`'s own TOML representation and
    /// deserialised from that.
    fn try_from(binding: KeybindingConfigRaw) -> std::result::Result<Self, Self::Error> {
        let key = if binding.key.chars().count() == 1 {
            format!("{{ Char = {:?} }}", binding.key)
        } else {
            format!("\"{}\"", binding.key)
        };

        let config = format!(
            "
                modifiers = {{ bits = 0 }}
                key = {key}
            ",
        );

        let mut key_event = toml::from_str::<Self>(&config).map_err(|error| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Couldn't parse keybinding ({binding:?}): {}", error.message()),
            )
        })?;

        if let Some(modifiers) = binding.mods {
            key_event.modifiers = modifiers.try_into().map_err(|error| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Couldn't parse keybinding modifier: {error:?}"),
                )
            })?;
        }

        Ok(key_event)
    }
}

/// Find the action bound to a key press, if there is one.
pub(crate) fn action_for(
    keybindings: &KeybindingsAsEvents,
    event: &termwiz::input::KeyEvent,
) -> Option<KeybindingAction> {
    keybindings
        .iter()
        .find(|(_, bound)| *bound == event)
        .map(|(action, _)| *action)
}

#[cfg(test)]
mod test {
    use termwiz::input::{KeyCode, KeyEvent, Modifiers};

    use super::*;

    fn run(config: &str) -> KeyEvent {
        let parsed: KeybindingConfigRaw = toml::from_str(config).unwrap();
        parsed.try_into().unwrap()
    }

    #[test]
    fn keybinding_space() {
        let actual = run(r#"key = " ""#);
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char(' '),
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn keybinding_bracket() {
        let actual = run(r#"key = "[""#);
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('['),
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn keybinding_named_key() {
        let actual = run(r#"key = "Home""#);
        let expected = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Home,
        };
        assert_eq!(actual, expected);
    }

    #[test]
    fn keybinding_with_modifiers() {
        let config = indoc::indoc! {r#"
            mods = "CTRL|SHIFT"
            key = "r"
        "#};
        let expected = KeyEvent {
            modifiers: Modifiers::CTRL | Modifiers::SHIFT,
            key: KeyCode::Char('r'),
        };
        assert_eq!(run(config), expected);
    }

    #[test]
    fn bad_key() {
        let parsed: KeybindingConfigRaw = toml::from_str(r#"key = "NotAKey""#).unwrap();
        let result: Result<KeyEvent, _> = parsed.try_into();
        assert!(result.is_err());
    }

    #[test]
    fn finds_bound_action() {
        let mut keybindings = KeybindingsAsEvents::new();
        let reset = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('r'),
        };
        keybindings.insert(KeybindingAction::Reset, reset.clone());

        assert_eq!(
            action_for(&keybindings, &reset),
            Some(KeybindingAction::Reset)
        );
        let unbound = KeyEvent {
            modifiers: Modifiers::NONE,
            key: KeyCode::Char('x'),
        };
        assert_eq!(action_for(&keybindings, &unbound), None);
    }
}
