use super::*;

use serde_json::json;
use shared::{
    domain::{ChatId, MessageId},
    protocol::KeyButton,
};

use crate::mock_server::{MockBotApi, TOKEN};

fn monitor_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![
            vec![KeyButton {
                icon: "📊".into(),
                label: "Status".into(),
                command: "/status".into(),
                callback_id: "mon_status".into(),
            }],
            vec![KeyButton {
                icon: "⬅️".into(),
                label: "Back".into(),
                command: "/start".into(),
                callback_id: "menu_main".into(),
            }],
        ],
    }
}

async fn sink_with(style: MenuStyle) -> (MockBotApi, TelegramSink) {
    let mock = MockBotApi::default();
    mock.ok("sendMessage", json!({ "message_id": 1 })).await;
    mock.ok("editMessageText", json!({ "message_id": 55 })).await;
    let base = mock.spawn().await;
    let api = Arc::new(TelegramApi::with_base_url(TOKEN, &base));
    (mock, TelegramSink::new(api, style))
}

#[tokio::test]
async fn inline_send_attaches_callback_buttons() {
    let (mock, sink) = sink_with(MenuStyle::Inline).await;

    sink.render(Render::Send {
        chat_id: ChatId(5),
        text: "*Monitoring*".into(),
        reply_to: Some(MessageId(9)),
        keyboard: Some(monitor_keyboard()),
    })
    .await
    .expect("send");

    let body = &mock.calls("sendMessage").await[0];
    assert_eq!(body["reply_to_message_id"], 9);
    let markup = &body["reply_markup"]["inline_keyboard"];
    assert_eq!(markup[0][0]["text"], "📊 Status");
    assert_eq!(markup[1][0]["callback_data"], "menu_main");
}

#[tokio::test]
async fn reply_send_uses_command_buttons() {
    let (mock, sink) = sink_with(MenuStyle::Reply).await;

    sink.render(Render::Send {
        chat_id: ChatId(5),
        text: "*Monitoring*".into(),
        reply_to: None,
        keyboard: Some(monitor_keyboard()),
    })
    .await
    .expect("send");

    let body = &mock.calls("sendMessage").await[0];
    assert!(body.get("reply_to_message_id").is_none());
    assert_eq!(body["reply_markup"]["keyboard"][0][0]["text"], "/status 📊");
    assert_eq!(body["reply_markup"]["keyboard"][1][0]["text"], "/start ⬅️");
}

#[tokio::test]
async fn empty_keyboard_is_omitted() {
    let (mock, sink) = sink_with(MenuStyle::Inline).await;

    sink.render(Render::Send {
        chat_id: ChatId(5),
        text: "Install finished.".into(),
        reply_to: None,
        keyboard: Some(Keyboard::default()),
    })
    .await
    .expect("send");

    assert!(mock.calls("sendMessage").await[0].get("reply_markup").is_none());
}

#[tokio::test]
async fn edit_targets_origin_message() {
    let (mock, sink) = sink_with(MenuStyle::Inline).await;

    sink.render(Render::Edit {
        chat_id: ChatId(5),
        message_id: MessageId(55),
        text: "*Host admin bot*".into(),
        keyboard: Some(monitor_keyboard()),
    })
    .await
    .expect("edit");

    let body = &mock.calls("editMessageText").await[0];
    assert_eq!(body["message_id"], 55);
    assert_eq!(body["text"], "*Host admin bot*");
    assert_eq!(body["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "mon_status");
}

#[tokio::test]
async fn reply_style_edit_drops_keyboard() {
    let (mock, sink) = sink_with(MenuStyle::Reply).await;

    sink.render(Render::Edit {
        chat_id: ChatId(5),
        message_id: MessageId(55),
        text: "text".into(),
        keyboard: Some(monitor_keyboard()),
    })
    .await
    .expect("edit");

    assert!(mock.calls("editMessageText").await[0].get("reply_markup").is_none());
}

#[tokio::test]
async fn acknowledge_answers_callback() {
    let (mock, sink) = sink_with(MenuStyle::Inline).await;

    sink.render(Render::Acknowledge {
        query_id: "q-1".into(),
        text: Some("Unauthorized".into()),
    })
    .await
    .expect("ack");

    let body = &mock.calls("answerCallbackQuery").await[0];
    assert_eq!(body["callback_query_id"], "q-1");
    assert_eq!(body["text"], "Unauthorized");
}
