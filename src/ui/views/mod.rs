mod add_user;
mod user_detail;
mod user_list;

pub use add_user::AddUserView;
pub use user_detail::UserDetailView;
pub use user_list::UserListView;
