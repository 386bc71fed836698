// Bot API wire types, limited to the fields the bot reads

use serde::Deserialize;

/// Envelope every Bot API method responds with
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
    pub migrate_to_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub video: Option<Video>,
    pub photo: Option<Vec<PhotoSize>>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    pub duration: u32,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}

impl Message {
    /// Returns the bot command (without the `@botname` suffix) if the text,
    /// or the caption of a media message, starts with one
    pub fn command(&self) -> Option<&str> {
        let text: &str = self.text.as_deref().or(self.caption.as_deref())?;
        let first: &str = text.split_whitespace().next()?;
        let command: &str = first.strip_prefix('/')?;
        let name: &str = command.split('@').next().unwrap_or(command);

        (!name.is_empty()).then_some(name)
    }

    /// The file id of the image attached to this message, if any.
    ///
    /// Photos come in several sizes; the largest one is taken.
    pub fn image_file_id(&self) -> Option<&str> {
        if let Some(sizes) = &self.photo {
            let largest: Option<&PhotoSize> = sizes
                .iter()
                .max_by_key(|p: &&PhotoSize| (u64::from(p.width) * u64::from(p.height), p.file_size));
            if let Some(photo) = largest {
                return Some(photo.file_id.as_str());
            }
        }

        self.document.as_ref().map(|d: &Document| d.file_id.as_str())
    }
}
