// Chat delivery by character name.
//
// A chat frame goes to the session currently routed under its recipient
// name, unchanged (sender name included). There is no queuing for absent
// recipients and no delivery receipt.

use lurk_protocol::{ChatMessage, ServerMessage};
use tracing::debug;

use crate::error::GameError;
use crate::world::World;

pub fn route_chat(world: &World, chat: ChatMessage) -> Result<(), GameError> {
    let Some(to) = world.route(chat.recipient.as_bytes()) else {
        return Err(GameError::RecipientNotFound(chat.recipient));
    };
    debug!(from = %chat.sender, to = %chat.recipient, "chat");
    world.send_to(to, ServerMessage::Chat(chat));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::config::GameConfig;

    #[test]
    fn forwards_verbatim_to_routed_session() {
        let mut world = World::new(GameConfig::default());
        let (tx, rx) = mpsc::channel();
        let (bob, _) = world.open_session(tx);
        world.register_name(&"Bob".into(), bob).unwrap();

        let chat = ChatMessage {
            recipient: "Bob".into(),
            sender: "Someone Else Entirely".into(),
            body: "psst".into(),
        };
        route_chat(&world, chat.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Chat(chat));
    }

    #[test]
    fn undecodable_text_reaches_recipient_byte_for_byte() {
        use lurk_protocol::{ClientMessage, WireMessage};

        let mut world = World::new(GameConfig::default());
        let (tx, rx) = mpsc::channel();
        let (bob, _) = world.open_session(tx);
        world.register_name(&"Bob".into(), bob).unwrap();

        let sent = ClientMessage::Chat(ChatMessage {
            recipient: "Bob".into(),
            sender: vec![0xC0u8, 0xAF].into(),
            body: vec![0xE9, b'A', 0xFF].into(),
        })
        .encode()
        .unwrap();
        let ClientMessage::Chat(chat) = ClientMessage::decode(&sent).unwrap() else {
            panic!("expected chat");
        };
        route_chat(&world, chat).unwrap();

        let delivered = rx.try_recv().unwrap().encode().unwrap();
        assert_eq!(delivered, sent);
    }

    #[test]
    fn unknown_recipient_is_rejected() {
        let world = World::new(GameConfig::default());
        let chat = ChatMessage {
            recipient: "Nobody".into(),
            ..ChatMessage::default()
        };
        assert_eq!(
            route_chat(&world, chat),
            Err(GameError::RecipientNotFound("Nobody".into()))
        );
    }
}
