//! Constructors for every MIL token kind.

use super::token::*;

/// Which end of an association a token marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationDirection {
    Origin,
    Destination,
}

pub fn command(name: &str) -> MilToken {
    MilToken::new(&COMMAND, name)
}

pub fn event(name: &str) -> MilToken {
    MilToken::new(&EVENT, name)
}

pub fn publish() -> MilToken {
    MilToken::new(&PUBLISH, "")
}

pub fn receive() -> MilToken {
    MilToken::new(&RECEIVE, "")
}

pub fn statement_terminator() -> MilToken {
    MilToken::new(&STATEMENT_TERMINATOR, "")
}

pub fn command_handler(name: &str) -> MilToken {
    MilToken::new(&COMMAND_HANDLER, name)
}

pub fn event_handler(name: &str) -> MilToken {
    MilToken::new(&EVENT_HANDLER, name)
}

pub fn aggregate_root(name: &str) -> MilToken {
    MilToken::new(&AGGREGATE_ROOT, name)
}

pub fn association(direction: AssociationDirection, name: &str) -> MilToken {
    match direction {
        AssociationDirection::Origin => MilToken::new(&ORIGIN_ASSOCIATION, name),
        AssociationDirection::Destination => MilToken::new(&DESTINATION_ASSOCIATION, name),
    }
}

/// `*<path> = <value>`
pub fn state_change(property_path: &str, new_state: &str) -> MilToken {
    MilToken::new(&STATE_CHANGE, format!("{} = {}", property_path, new_state))
}

pub fn delay() -> MilToken {
    MilToken::new(&DELAY, "")
}

/// `%<process>, <property>:[<state>, <state>, ...]`
pub fn state_definition<S: AsRef<str>>(
    process: &str,
    state_property: &str,
    states: impl IntoIterator<Item = S>,
) -> MilToken {
    let states: Vec<String> = states.into_iter().map(|s| s.as_ref().to_string()).collect();
    MilToken::new(
        &STATE_DEFINITION,
        format!("{}, {}:[{}]", process, state_property, states.join(", ")),
    )
}

pub fn indentation() -> MilToken {
    MilToken::new(&INDENTATION, "")
}

pub fn empty() -> MilToken {
    MilToken::new(&EMPTY, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NL: &str = LINE_TERMINATOR;

    #[test]
    fn test_command_and_event_render_with_markers() {
        assert_eq!(command("X").to_string(), "X?");
        assert_eq!(event("X").to_string(), "X!");
    }

    #[test]
    fn test_command_line_concatenates() {
        let line = render(&[
            command("Foo"),
            publish(),
            command_handler("Bar"),
            statement_terminator(),
        ]);
        assert_eq!(line, format!("Foo? -> Bar{}", NL));
    }

    #[test]
    fn test_seat_reservation_line() {
        let line = render(&[
            command("MakeSeatReservation"),
            publish(),
            command_handler("SeatsAvailabilityHandler"),
            statement_terminator(),
        ]);
        assert_eq!(line, format!("MakeSeatReservation? -> SeatsAvailabilityHandler{}", NL));
    }

    #[test]
    fn test_aggregate_root_with_association() {
        let line = render(&[
            aggregate_root("SeatsAvailability"),
            association(AssociationDirection::Origin, ""),
            event("SeatsReserved"),
            publish(),
            statement_terminator(),
        ]);
        assert_eq!(line, format!("@SeatsAvailability:SeatsReserved! -> {}", NL));
    }

    #[test]
    fn test_receive_with_process_router() {
        let line = render(&[
            receive(),
            event_handler("RegistrationProcessRouter"),
            association(AssociationDirection::Origin, ""),
            association(AssociationDirection::Destination, "RegistrationProcess"),
            statement_terminator(),
        ]);
        assert_eq!(line, format!(" -> RegistrationProcessRouter::RegistrationProcess{}", NL));
    }

    #[test]
    fn test_state_change() {
        let line = render(&[
            state_change("RegistrationProcess.State", "AwaitingPayment"),
            statement_terminator(),
        ]);
        assert_eq!(line, format!("*RegistrationProcess.State = AwaitingPayment{}", NL));
    }

    #[test]
    fn test_delayed_send() {
        let line = render(&[
            association(AssociationDirection::Destination, "MarkSeatsReserved"),
            MilToken::new(&COMMAND, ""),
            publish(),
            statement_terminator(),
            association(AssociationDirection::Destination, "ExpireRegistrationProcess"),
            MilToken::new(&COMMAND, ""),
            publish(),
            delay(),
            statement_terminator(),
        ]);
        assert_eq!(
            line,
            format!(
                ":MarkSeatsReserved? -> {nl}:ExpireRegistrationProcess? ->  [Delay] {nl}",
                nl = NL
            )
        );
    }

    #[test]
    fn test_state_definition() {
        let token = state_definition("ShortProcess", "State", ["NoState", "StateA", "DifferentState"]);
        assert!(token.is(&STATE_DEFINITION));
        assert_eq!(token.member_name, "ShortProcess, State:[NoState, StateA, DifferentState]");
        assert_eq!(token.to_string(), "%ShortProcess, State:[NoState, StateA, DifferentState]");
    }

    #[test]
    fn test_payloadless_tokens() {
        assert_eq!(publish().to_string(), " -> ");
        assert_eq!(receive().to_string(), " -> ");
        assert_eq!(empty().to_string(), "");
        assert_eq!(indentation().to_string(), "\t");
        assert_eq!(statement_terminator().to_string(), NL);
    }
}
