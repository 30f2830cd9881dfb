use crate::mcp::types::ToolDefinition;
use serde_json::{json, Map, Value};

pub const GET_POST: &str = "get_post";
pub const LIST_POSTS: &str = "list_posts";
pub const GET_COMMENTS_FOR_POST: &str = "get_comments_for_post";
pub const GET_USER: &str = "get_user";
pub const LIST_USERS: &str = "list_users";

/// Bounded integer argument accepted by a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerParam {
    pub name: &'static str,
    pub description: &'static str,
    pub minimum: i64,
    pub maximum: i64,
    pub required: bool,
}

impl IntegerParam {
    /// Extract the value of a required parameter.
    pub fn require(&self, args: &Value) -> Result<i64, String> {
        self.optional(args)?.ok_or_else(|| self.violation())
    }

    /// Extract the value of a parameter that may be absent or null.
    pub fn optional(&self, args: &Value) -> Result<Option<i64>, String> {
        match args.get(self.name).filter(|value| !value.is_null()) {
            None if self.required => Err(self.violation()),
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .filter(|n| (self.minimum..=self.maximum).contains(n))
                .map(Some)
                .ok_or_else(|| self.violation()),
        }
    }

    fn violation(&self) -> String {
        format!(
            "{} must be an integer between {} and {}",
            self.name, self.minimum, self.maximum
        )
    }

    fn schema(&self) -> Value {
        json!({
            "type": "integer",
            "description": self.description,
            "minimum": self.minimum,
            "maximum": self.maximum,
        })
    }
}

pub const POST_ID: IntegerParam = IntegerParam {
    name: "post_id",
    description: "The ID of the post to fetch (positive integer between 1-100)",
    minimum: 1,
    maximum: 100,
    required: true,
};

pub const COMMENTS_POST_ID: IntegerParam = IntegerParam {
    name: "post_id",
    description: "The ID of the post to fetch comments for (positive integer between 1-100)",
    minimum: 1,
    maximum: 100,
    required: true,
};

pub const USER_ID: IntegerParam = IntegerParam {
    name: "user_id",
    description: "The ID of the user to fetch (positive integer between 1-10)",
    minimum: 1,
    maximum: 10,
    required: true,
};

pub const USER_FILTER: IntegerParam = IntegerParam {
    name: "user_id",
    description: "Optional user ID to filter posts by (positive integer between 1-10)",
    minimum: 1,
    maximum: 10,
    required: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [IntegerParam],
}

impl ToolDescriptor {
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|param| (param.name.to_string(), param.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

static CATALOGUE: [ToolDescriptor; 5] = [
    ToolDescriptor {
        name: GET_POST,
        description: "Fetch a single post from JSONPlaceholder by post ID. Returns post details including title and body.",
        params: &[POST_ID],
    },
    ToolDescriptor {
        name: LIST_POSTS,
        description: "Fetch all posts from JSONPlaceholder. Optionally filter by user ID. Returns a list of posts with titles and bodies.",
        params: &[USER_FILTER],
    },
    ToolDescriptor {
        name: GET_COMMENTS_FOR_POST,
        description: "Fetch all comments for a specific post from JSONPlaceholder. Returns a list of comments with names, emails, and bodies.",
        params: &[COMMENTS_POST_ID],
    },
    ToolDescriptor {
        name: GET_USER,
        description: "Fetch a single user from JSONPlaceholder by user ID. Returns user details including name, email, and contact information.",
        params: &[USER_ID],
    },
    ToolDescriptor {
        name: LIST_USERS,
        description: "Fetch all users from JSONPlaceholder. Returns a list of users with names, emails, and contact information.",
        params: &[],
    },
];

pub fn definitions() -> Vec<ToolDefinition> {
    CATALOGUE.iter().map(ToolDescriptor::definition).collect()
}
